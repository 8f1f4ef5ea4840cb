//! Domain models shared across waypoint crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tags::{
    DOCUMENT_CATEGORIES, PRESENTATION_CATEGORIES, UPLOAD_CATEGORIES,
};

// =============================================================================
// ROLES & SESSIONS
// =============================================================================

/// Portal role attached to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator,
    /// Trainer/editor: may curate content and onboarding plans.
    Trainer,
    Employee,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::Trainer => "trainer",
            Self::Employee => "employee",
            Self::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "administrator" | "admin" => Ok(Self::Administrator),
            "trainer" | "editor" => Ok(Self::Trainer),
            "employee" => Ok(Self::Employee),
            "viewer" => Ok(Self::Viewer),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Roles allowed to mutate portal content.
pub const CURATOR_ROLES: &[Role] = &[Role::Administrator, Role::Trainer];

/// Every role; used for read-only actions.
pub const ALL_ROLES: &[Role] = &[
    Role::Administrator,
    Role::Trainer,
    Role::Employee,
    Role::Viewer,
];

/// Authenticated caller as reported by the session collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub role: Role,
}

impl Session {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

// =============================================================================
// TAGGED RECORDS
// =============================================================================

/// Entity type sharing the tagged-record shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Document,
    Presentation,
    /// Uploaded manual or reference/index file.
    Upload,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Presentation => "presentation",
            Self::Upload => "upload",
        }
    }

    /// Category vocabulary of this kind; at most one member per record.
    pub fn categories(&self) -> &'static [&'static str] {
        match self {
            Self::Document => DOCUMENT_CATEGORIES,
            Self::Presentation => PRESENTATION_CATEGORIES,
            Self::Upload => UPLOAD_CATEGORIES,
        }
    }

    /// Listing page whose cache depends on records of this kind.
    pub fn page_path(&self) -> &'static str {
        match self {
            Self::Document => "/documents",
            Self::Presentation => "/presentations",
            Self::Upload => "/manuals",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "document" | "documents" => Ok(Self::Document),
            "presentation" | "presentations" => Ok(Self::Presentation),
            "upload" | "uploads" | "manual" | "manuals" => Ok(Self::Upload),
            _ => Err(format!("Invalid record kind: {}", s)),
        }
    }
}

/// Document, presentation or upload row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedRecord {
    pub id: Uuid,
    pub kind: RecordKind,
    pub title: String,
    /// URL, uploads-relative path or `data:` URI.
    pub path: String,
    /// Flat tag list; see [`crate::tags`] for the encoding.
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a tagged record.
#[derive(Debug, Clone)]
pub struct CreateRecordRequest {
    pub kind: RecordKind,
    pub title: String,
    pub path: String,
    pub tags: Vec<String>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateRecordRequest {
    pub title: Option<String>,
    pub path: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Tag predicate for record listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TagFilter {
    #[default]
    All,
    /// Tags array contains this tag.
    Contains(String),
    /// Tags array contains every one of these tags.
    ContainsAll(Vec<String>),
}

impl TagFilter {
    pub fn matches(&self, tags: &[String]) -> bool {
        match self {
            Self::All => true,
            Self::Contains(tag) => tags.iter().any(|t| t == tag),
            Self::ContainsAll(wanted) => wanted.iter().all(|w| tags.iter().any(|t| t == w)),
        }
    }
}

// =============================================================================
// LEARNING PATHS
// =============================================================================

/// Week-level grouping of an onboarding plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningPath {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Named link attached to a learning task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

impl Attachment {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Day-level (or extras) content unit within a learning path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningTask {
    pub id: Uuid,
    pub path_id: Uuid,
    /// `None` marks an extra/bonus item.
    pub day: Option<i32>,
    pub title: String,
    pub program_md: String,
    pub note_md: String,
    pub trainer: Option<String>,
    pub attachments: Vec<Attachment>,
    /// Order within the (path, day) bucket; never renumbered.
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert payload keyed by `(path_id, day, title)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertTaskRequest {
    pub day: Option<i32>,
    pub title: String,
    pub program_md: String,
    pub note_md: String,
    pub trainer: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// Edit of an existing task; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateTaskRequest {
    pub day: Option<Option<i32>>,
    pub title: Option<String>,
    pub program_md: Option<String>,
    pub note_md: Option<String>,
    pub trainer: Option<Option<String>>,
    pub attachments: Option<Vec<Attachment>>,
}

/// Whether an upsert inserted or updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: Uuid,
    pub created: bool,
}

/// A path with its tasks grouped for display.
#[derive(Debug, Clone, Serialize)]
pub struct LearningPlan {
    pub path: LearningPath,
    /// Ascending by day, each bucket ascending by position.
    pub days: Vec<(i32, Vec<LearningTask>)>,
    pub extras: Vec<LearningTask>,
}

// =============================================================================
// INVITES
// =============================================================================

/// Single-use registration invite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    pub token: String,
    pub role: Role,
    pub email: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Invite {
    pub fn is_consumable(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct CreateInviteRequest {
    pub token: String,
    pub role: Role,
    pub email: Option<String>,
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// BATCH RESULTS
// =============================================================================

/// A single row (or source) that failed during a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// 1-based source line, or 0 for non-line sources.
    pub line: usize,
    pub message: String,
}

/// Outcome of a bulk import or catalog sync; partial success is normal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub added: Vec<Uuid>,
    pub updated: Vec<Uuid>,
    pub skipped: usize,
    pub errors: Vec<RowError>,
}

impl ImportSummary {
    pub fn record_error(&mut self, line: usize, message: impl Into<String>) {
        self.errors.push(RowError {
            line,
            message: message.into(),
        });
    }

    pub fn merge(&mut self, other: ImportSummary) {
        self.added.extend(other.added);
        self.updated.extend(other.updated);
        self.skipped += other.skipped;
        self.errors.extend(other.errors);
    }
}
