//! Centralized default constants for waypoint.
//!
//! Crates reference these instead of defining their own magic numbers.

// =============================================================================
// STORAGE
// =============================================================================

/// Default root directory for persisted uploads.
pub const UPLOADS_DIR: &str = "./public/uploads";

/// Public URL prefix under which disk uploads are served.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Maximum accepted upload size (25 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

// =============================================================================
// NETWORK
// =============================================================================

/// Timeout for remote page/catalog fetches.
pub const FETCH_TIMEOUT_SECS: u64 = 15;

/// Longest scraped page title kept as a record title.
pub const MAX_TITLE_LEN: usize = 200;

// =============================================================================
// INVITES
// =============================================================================

/// Invite lifetime (one week).
pub const INVITE_TTL_HOURS: i64 = 168;

/// Longest configurable invite lifetime (one year).
pub const MAX_INVITE_TTL_HOURS: i64 = 24 * 365;

/// Length of generated invite tokens.
pub const INVITE_TOKEN_LEN: usize = 32;

// =============================================================================
// ORDERING
// =============================================================================

/// Attempts at claiming a fresh position before giving up.
pub const POSITION_CLAIM_RETRIES: u32 = 5;

// =============================================================================
// PAGES
// =============================================================================

/// Onboarding overview page.
pub const ONBOARDING_PAGE: &str = "/onboarding";

/// Invite administration page.
pub const INVITES_PAGE: &str = "/admin/invites";
