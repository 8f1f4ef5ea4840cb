//! # waypoint-db
//!
//! Store layer for the waypoint training portal.
//!
//! This crate provides:
//! - Connection pool management
//! - PostgreSQL repositories for tagged records, learning paths/tasks and invites
//! - A startup probe for optional schema columns
//! - An in-memory store with the same semantics
//! - Upload persistence (disk or `data:` URI)
//!
//! ## Example
//!
//! ```rust,ignore
//! use waypoint_db::{Database, RecordRepository, CreateRecordRequest, RecordKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut db = Database::connect("postgres://localhost/waypoint").await?;
//!     db.migrate().await?;
//!
//!     let id = db.records.insert(CreateRecordRequest {
//!         kind: RecordKind::Document,
//!         title: "Employment contract".to_string(),
//!         path: "https://intranet.example/contract.pdf".to_string(),
//!         tags: vec!["Contracts".to_string()],
//!     }).await?;
//!
//!     println!("Created record: {}", id);
//!     Ok(())
//! }
//! ```

pub mod capabilities;
pub mod file_storage;
pub mod invites;
pub mod learning;
pub mod memory;
pub mod pool;
pub mod records;

// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use waypoint_core::*;

pub use capabilities::Capabilities;
pub use file_storage::{DataUriFileStore, DiskFileStore};
pub use invites::PgInviteRepository;
pub use learning::{fold_attachments_into_note, PgLearningRepository};
pub use memory::MemoryStore;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use records::PgRecordRepository;

/// Database handle bundling the pool and every repository.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Optional schema features detected at connect time.
    pub capabilities: Capabilities,
    /// Documents, presentations and uploads.
    pub records: PgRecordRepository,
    /// Onboarding paths and tasks.
    pub learning: PgLearningRepository,
    /// Registration invites.
    pub invites: PgInviteRepository,
}

impl Database {
    /// Build repositories over an existing pool with known capabilities.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>, capabilities: Capabilities) -> Self {
        Self {
            records: PgRecordRepository::new(pool.clone()),
            learning: PgLearningRepository::new(pool.clone(), capabilities),
            invites: PgInviteRepository::new(pool.clone(), capabilities),
            capabilities,
            pool,
        }
    }

    /// Probe the schema once and build repositories over `pool`.
    pub async fn from_pool(pool: sqlx::Pool<sqlx::Postgres>) -> Result<Self> {
        let capabilities = Capabilities::probe(&pool).await?;
        Ok(Self::new(pool, capabilities))
    }

    /// Connect to the database with default pool configuration.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Self::from_pool(pool).await
    }

    /// Connect to the database with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Self::from_pool(pool).await
    }

    /// Run pending migrations, then re-probe capabilities.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&mut self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;

        let capabilities = Capabilities::probe(&self.pool).await?;
        if capabilities != self.capabilities {
            tracing::info!(
                subsystem = "db",
                op = "migrate",
                task_attachments = capabilities.task_attachments,
                invite_email = capabilities.invite_email,
                "Schema capabilities changed after migration"
            );
            *self = Self::new(self.pool.clone(), capabilities);
        }
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
