//! # waypoint-actions
//!
//! Server actions for the waypoint training portal.
//!
//! Each action authorizes the caller, normalizes its input, reconciles tags
//! or parses import rows, writes through the store traits and invalidates the
//! affected pages. Page rendering and routing live in the embedding
//! application.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use waypoint_actions::{Portal, RecordForm};
//! use waypoint_core::{LoggingPageCache, RecordKind, TagIntent};
//!
//! let portal = Portal::from_env(sessions, Arc::new(LoggingPageCache)).await?;
//! let id = portal
//!     .create_record(
//!         RecordKind::Document,
//!         RecordForm {
//!             title: "Travel policy".into(),
//!             path: "https://intranet.example/travel.pdf".into(),
//!             tags: TagIntent::keep().with_category("Policies"),
//!         },
//!     )
//!     .await?;
//! ```

pub mod auth;
pub mod config;
pub mod fetch;
pub mod imports;
pub mod invites;
pub mod learning;
pub mod portal;
pub mod records;
pub mod telemetry;

pub use auth::authorize;
pub use config::{LogConfig, LogFormat, PortalConfig, StorageMode};
pub use fetch::HttpFetcher;
pub use imports::CatalogSource;
pub use invites::generate_token;
pub use learning::{group_plan, PathUpdate};
pub use portal::{onboarding_page, Collaborators, Portal, PortalSettings};
pub use records::{RecordForm, RecordUpdate, UploadForm};
pub use telemetry::init_tracing;
