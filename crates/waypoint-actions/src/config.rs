//! Environment configuration.
//!
//! Environment variables:
//!   DATABASE_URL        - store connection (default: postgres://localhost/waypoint)
//!   DB_MAX_CONNECTIONS  - pool size (default: 10)
//!   UPLOADS_DIR         - root for persisted files (default: ./public/uploads)
//!   UPLOADS_URL_PREFIX  - public prefix for stored files (default: /uploads)
//!   STORAGE_MODE        - "disk" or "data_uri" (default: disk)
//!   MAX_UPLOAD_BYTES    - upload size cap (default: 25 MiB)
//!   FETCH_TIMEOUT_SECS  - remote title/catalog fetch timeout (default: 15)
//!   INVITE_TTL_HOURS    - invite lifetime (default: 168)
//!   LOG_FORMAT          - "json" or "text" (default: text)
//!   LOG_FILE            - path to a daily-rolling log file (optional)
//!   LOG_ANSI            - "true"/"false" override ANSI colors
//!   RUST_LOG            - standard env filter (default: waypoint=info)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use waypoint_core::defaults;
use waypoint_core::{Error, Result};

/// Default store connection string.
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/waypoint";

/// Default `RUST_LOG` filter.
pub const DEFAULT_LOG_FILTER: &str =
    "waypoint_actions=info,waypoint_db=info,waypoint_core=info";

/// Where uploaded bytes go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageMode {
    /// Files under `UPLOADS_DIR`, served from `UPLOADS_URL_PREFIX`.
    #[default]
    Disk,
    /// Inline `data:` URIs; for deployments without a writable disk.
    DataUri,
}

impl FromStr for StorageMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "disk" | "fs" | "filesystem" => Ok(Self::Disk),
            "data_uri" | "data-uri" | "inline" => Ok(Self::DataUri),
            other => Err(Error::Config(format!("Invalid STORAGE_MODE: {}", other))),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub file: Option<PathBuf>,
    /// `None` auto-detects on the console and disables colors in files.
    pub ansi: Option<bool>,
    /// Used when `RUST_LOG` is unset or invalid.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            file: None,
            ansi: None,
            default_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        Self {
            format,
            file: lookup("LOG_FILE").filter(|p| !p.is_empty()).map(PathBuf::from),
            ansi: lookup("LOG_ANSI").map(|v| v == "true" || v == "1"),
            default_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// Portal configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub uploads_dir: PathBuf,
    pub uploads_url_prefix: String,
    pub storage_mode: StorageMode,
    pub max_upload_bytes: u64,
    pub fetch_timeout: Duration,
    pub invite_ttl_hours: i64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            db_max_connections: 10,
            uploads_dir: PathBuf::from(defaults::UPLOADS_DIR),
            uploads_url_prefix: defaults::UPLOADS_URL_PREFIX.to_string(),
            storage_mode: StorageMode::Disk,
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
            fetch_timeout: Duration::from_secs(defaults::FETCH_TIMEOUT_SECS),
            invite_ttl_hours: defaults::INVITE_TTL_HOURS,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("Invalid {}: {}", key, raw))),
    }
}

impl PortalConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base = Self::default();

        let db_max_connections: u32 = parse_var(
            "DB_MAX_CONNECTIONS",
            lookup("DB_MAX_CONNECTIONS"),
            base.db_max_connections,
        )?;
        if db_max_connections == 0 {
            return Err(Error::Config("DB_MAX_CONNECTIONS must be at least 1".into()));
        }

        let invite_ttl_hours: i64 =
            parse_var("INVITE_TTL_HOURS", lookup("INVITE_TTL_HOURS"), base.invite_ttl_hours)?;
        if invite_ttl_hours <= 0 || invite_ttl_hours > defaults::MAX_INVITE_TTL_HOURS {
            return Err(Error::Config(format!(
                "INVITE_TTL_HOURS must be between 1 and {}",
                defaults::MAX_INVITE_TTL_HOURS
            )));
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(base.database_url),
            db_max_connections,
            uploads_dir: lookup("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or(base.uploads_dir),
            uploads_url_prefix: lookup("UPLOADS_URL_PREFIX").unwrap_or(base.uploads_url_prefix),
            storage_mode: match lookup("STORAGE_MODE") {
                Some(mode) => mode.parse()?,
                None => base.storage_mode,
            },
            max_upload_bytes: parse_var(
                "MAX_UPLOAD_BYTES",
                lookup("MAX_UPLOAD_BYTES"),
                base.max_upload_bytes,
            )?,
            fetch_timeout: Duration::from_secs(parse_var(
                "FETCH_TIMEOUT_SECS",
                lookup("FETCH_TIMEOUT_SECS"),
                base.fetch_timeout.as_secs(),
            )?),
            invite_ttl_hours,
        })
    }
}
