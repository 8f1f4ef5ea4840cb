//! Core traits for waypoint abstractions.
//!
//! The store, session, file storage, page cache and page fetcher are external
//! collaborators. These traits are the contracts actions depend on, so the
//! PostgreSQL store, the in-memory store and test doubles are interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// STORE
// =============================================================================

/// Repository for documents, presentations and uploads.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Insert a new record.
    async fn insert(&self, req: CreateRecordRequest) -> Result<Uuid>;

    /// Fetch a record by ID.
    async fn fetch(&self, id: Uuid) -> Result<TaggedRecord>;

    /// Find a record of `kind` by its path (natural key for imports).
    async fn find_by_path(&self, kind: RecordKind, path: &str) -> Result<Option<TaggedRecord>>;

    /// Apply a partial update.
    async fn update(&self, id: Uuid, req: UpdateRecordRequest) -> Result<()>;

    /// Delete a record.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// List records of `kind` matching a tag predicate, newest first.
    async fn list(&self, kind: RecordKind, filter: &TagFilter) -> Result<Vec<TaggedRecord>>;
}

/// Repository for onboarding paths and their tasks.
#[async_trait]
pub trait LearningRepository: Send + Sync {
    /// Create a path at the end of the display order.
    async fn create_path(&self, slug: &str, title: &str) -> Result<LearningPath>;

    async fn find_path(&self, slug: &str) -> Result<Option<LearningPath>>;

    /// All paths ordered by `sort_order`.
    async fn list_paths(&self) -> Result<Vec<LearningPath>>;

    async fn update_path(&self, id: Uuid, title: Option<&str>, sort_order: Option<i32>)
        -> Result<()>;

    /// Delete a path and its tasks.
    async fn delete_path(&self, id: Uuid) -> Result<()>;

    /// Insert or update the task keyed by `(path_id, day, title)`.
    ///
    /// New tasks get the next position in their bucket; updates keep theirs.
    async fn upsert_task(&self, path_id: Uuid, req: UpsertTaskRequest) -> Result<UpsertOutcome>;

    async fn fetch_task(&self, id: Uuid) -> Result<LearningTask>;

    async fn update_task(&self, id: Uuid, req: UpdateTaskRequest) -> Result<()>;

    /// Delete a task. Remaining positions are not renumbered.
    async fn delete_task(&self, id: Uuid) -> Result<()>;

    /// Tasks of a path ordered by day (extras last) then position.
    async fn list_tasks(&self, path_id: Uuid) -> Result<Vec<LearningTask>>;
}

/// Repository for registration invites.
#[async_trait]
pub trait InviteRepository: Send + Sync {
    async fn create(&self, req: CreateInviteRequest) -> Result<Invite>;

    async fn find(&self, token: &str) -> Result<Option<Invite>>;

    /// Mark the invite used if it is unused and unexpired at `now`.
    ///
    /// Returns `None` when nothing was consumed; at most one caller ever
    /// receives `Some` for a given token.
    async fn consume(&self, token: &str, now: DateTime<Utc>) -> Result<Option<Invite>>;

    /// Delete an invite; returns whether it existed.
    async fn revoke(&self, token: &str) -> Result<bool>;

    /// All invites, newest first.
    async fn list(&self) -> Result<Vec<Invite>>;
}

// =============================================================================
// COLLABORATORS
// =============================================================================

/// Source of the caller's identity.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current(&self) -> Result<Option<Session>>;
}

/// Persists uploaded bytes and returns a locator usable as a record path.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Returns an uploads-relative URL path or a `data:` URI.
    async fn persist(&self, bytes: &[u8], suggested_name: &str) -> Result<String>;
}

/// Invalidates cached rendered pages after a mutation.
#[async_trait]
pub trait PageCache: Send + Sync {
    async fn revalidate(&self, path: &str);
}

/// Fetches remote pages (title scraping, reference catalogs).
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Body of `url` as text; non-success statuses are errors.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Page cache that only logs; for deployments without a rendering cache.
pub struct LoggingPageCache;

#[async_trait]
impl PageCache for LoggingPageCache {
    async fn revalidate(&self, path: &str) {
        tracing::debug!(subsystem = "actions", component = "page_cache", path, "Revalidate");
    }
}

/// Fixed session; for embedding callers that already authenticated.
pub struct StaticSession(pub Option<Session>);

#[async_trait]
impl SessionProvider for StaticSession {
    async fn current(&self) -> Result<Option<Session>> {
        Ok(self.0.clone())
    }
}
