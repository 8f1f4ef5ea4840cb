//! Structured logging field name constants for waypoint.
//!
//! All crates use these names for structured fields so log aggregation can
//! query imports, actions and storage events the same way.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, fallback applied or row/source skipped |
//! | INFO  | Completed mutations, batch summaries, startup |
//! | DEBUG | Decision points (capability probe, tag reconciliation) |
//! | TRACE | Per-row iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "actions", "db", "import", "storage", "fetch"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "records", "learning", "invites", "pool", "capabilities"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "create", "update", "import_csv", "sync_catalog"
pub const OPERATION: &str = "op";

/// Acting user id.
pub const USER_ID: &str = "user_id";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Tagged record UUID.
pub const RECORD_ID: &str = "record_id";

/// Record kind ("document", "presentation", "upload").
pub const RECORD_KIND: &str = "record_kind";

/// Learning path slug.
pub const PATH_SLUG: &str = "path_slug";

/// Learning task UUID.
pub const TASK_ID: &str = "task_id";

// ─── Import fields ─────────────────────────────────────────────────────────

/// 1-based source line of an import row.
pub const LINE: &str = "line";

/// Rows added by an import.
pub const ADDED: &str = "added";

/// Rows updated by an import.
pub const UPDATED: &str = "updated";

/// Rows skipped by an import.
pub const SKIPPED: &str = "skipped";

/// Rows that failed during an import.
pub const FAILED: &str = "failed";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows returned by a query.
pub const RESULT_COUNT: &str = "result_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
