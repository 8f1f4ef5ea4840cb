//! # waypoint-core
//!
//! Core types, traits, and pure logic for the waypoint training portal.
//!
//! This crate provides the tag reconciliation engine, the bulk import
//! parsers and the collaborator contracts that the store and action crates
//! build on. It performs no I/O.

pub mod defaults;
pub mod error;
pub mod file_safety;
pub mod html;
pub mod import;
pub mod logging;
pub mod models;
pub mod tags;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use file_safety::{guess_mime_type, sanitize_filename, validate_file, ValidationResult};
pub use html::{extract_catalog_links, scrape_page_title};
pub use import::{
    csv_record_rows, csv_task_rows, extract_day_prefix, parse_attachment_cell, parse_csv,
    pipe_task_rows, split_pipe_line, url_rows, Parsed, RecordRow, SkipReason, TaskRow, UrlRow,
};
pub use models::*;
pub use tags::{
    reconcile_tags, Change, IntegrationGroup, RefScope, TagIntent, TagSet, UseCaseChoice,
};
pub use traits::*;
