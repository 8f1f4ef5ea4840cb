//! Error types for waypoint.

use thiserror::Error;

/// Result type alias using waypoint's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for waypoint operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Tagged record (document, presentation, upload) not found
    #[error("Record not found: {0}")]
    RecordNotFound(uuid::Uuid),

    /// Learning task not found
    #[error("Learning task not found: {0}")]
    TaskNotFound(uuid::Uuid),

    /// Learning path not found (by slug)
    #[error("Learning path not found: {0}")]
    PathNotFound(String),

    /// Invalid input (validation failure)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No session present
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Session present, role not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Invite token unknown, expired or already consumed
    #[error("Invite unavailable: {0}")]
    InviteUnavailable(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// File storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures that must reach the caller untouched
    /// (authorization and validation).
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::Unauthorized(_)
                | Error::Forbidden(_)
                | Error::InvalidInput(_)
                | Error::InviteUnavailable(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::InvalidInput(format!("CSV: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("test resource".to_string());
        assert_eq!(err.to_string(), "Not found: test resource");
    }

    #[test]
    fn test_error_display_record_not_found() {
        let id = Uuid::nil();
        let err = Error::RecordNotFound(id);
        assert_eq!(err.to_string(), format!("Record not found: {}", id));
    }

    #[test]
    fn test_error_display_path_not_found() {
        let err = Error::PathNotFound("week-1".to_string());
        assert_eq!(err.to_string(), "Learning path not found: week-1");
    }

    #[test]
    fn test_error_display_unauthorized() {
        let err = Error::Unauthorized("no session".to_string());
        assert_eq!(err.to_string(), "Unauthorized: no session");
    }

    #[test]
    fn test_error_display_forbidden() {
        let err = Error::Forbidden("insufficient permissions".to_string());
        assert_eq!(err.to_string(), "Forbidden: insufficient permissions");
    }

    #[test]
    fn test_caller_errors() {
        assert!(Error::Forbidden("x".into()).is_caller_error());
        assert!(Error::InvalidInput("x".into()).is_caller_error());
        assert!(!Error::Request("x".into()).is_caller_error());
        assert!(!Error::Internal("x".into()).is_caller_error());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
