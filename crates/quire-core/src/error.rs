//! Error types module
//!
//! All errors are unified under the `AppError` enum. Domain variants (`NoUser`,
//! `NoGroup`, `Forbidden`, ...) are distinguished, matchable values that the HTTP
//! layer maps to stable status codes. Infrastructure failures (database,
//! storage, identity provider) stay opaque: they carry context for the logs but
//! are rendered as a generic failure to clients.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for rejected operations worth noticing
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "GROUP_NOT_FOUND")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No such user: {0}")]
    NoUser(String),

    #[error("No such group: {0}")]
    NoGroup(String),

    #[error("No such resource: {0}")]
    NoResource(String),

    #[error("No such file: {0}")]
    NoFile(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid permission: a privately readable group cannot be publicly writable")]
    InvalidPermission,

    #[error("Invalid resource type: {0}")]
    InvalidResourceType(String),

    #[error("Resource already exists: {0}")]
    ResourceAlreadyExists(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: format!("{:#}", err),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
/// client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::NoUser(_) => (
            404,
            "USER_NOT_FOUND",
            false,
            Some("Verify the user is an active member"),
            false,
            LogLevel::Debug,
        ),
        AppError::NoGroup(_) => (
            404,
            "GROUP_NOT_FOUND",
            false,
            Some("Verify the group ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::NoResource(_) => (
            404,
            "RESOURCE_NOT_FOUND",
            false,
            Some("Verify the resource IDs exist"),
            false,
            LogLevel::Debug,
        ),
        AppError::NoFile(_) => (
            404,
            "FILE_NOT_FOUND",
            false,
            Some("Verify the file ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Forbidden(_) => (
            403,
            "FORBIDDEN",
            false,
            Some("Ask a group administrator for access"),
            false,
            LogLevel::Warn,
        ),
        AppError::InvalidPermission => (
            400,
            "INVALID_PERMISSION",
            false,
            Some("Make the group publicly readable or privately writable"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidResourceType(_) => (
            400,
            "INVALID_RESOURCE_TYPE",
            false,
            Some("Use resource type 'other' for non-image files"),
            false,
            LogLevel::Debug,
        ),
        AppError::ResourceAlreadyExists(_) => (
            409,
            "RESOURCE_ALREADY_EXISTS",
            false,
            None,
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Log in again to obtain a fresh access token"),
            false,
            LogLevel::Debug,
        ),
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::IdentityProvider(_) => (
            502,
            "IDENTITY_PROVIDER_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::NoUser(_) => "NoUser",
            AppError::NoGroup(_) => "NoGroup",
            AppError::NoResource(_) => "NoResource",
            AppError::NoFile(_) => "NoFile",
            AppError::Forbidden(_) => "Forbidden",
            AppError::InvalidPermission => "InvalidPermission",
            AppError::InvalidResourceType(_) => "InvalidResourceType",
            AppError::ResourceAlreadyExists(_) => "ResourceAlreadyExists",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::IdentityProvider(_) => "IdentityProvider",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Whether this is one of the domain errors rather than an infrastructure failure
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            AppError::NoUser(_)
                | AppError::NoGroup(_)
                | AppError::NoResource(_)
                | AppError::NoFile(_)
                | AppError::Forbidden(_)
                | AppError::InvalidPermission
                | AppError::InvalidResourceType(_)
                | AppError::ResourceAlreadyExists(_)
        )
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::NoUser(ref msg)
            | AppError::NoGroup(ref msg)
            | AppError::NoResource(ref msg)
            | AppError::NoFile(ref msg)
            | AppError::Forbidden(ref msg)
            | AppError::InvalidResourceType(ref msg)
            | AppError::ResourceAlreadyExists(ref msg)
            | AppError::InvalidInput(ref msg)
            | AppError::PayloadTooLarge(ref msg)
            | AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::InvalidPermission => {
                "A privately readable group cannot be publicly writable".to_string()
            }
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::IdentityProvider(_) => "Failed to reach the identity service".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_error_metadata_database() {
        #[cfg(feature = "sqlx")]
        let err = AppError::from(sqlx::Error::PoolClosed);
        #[cfg(not(feature = "sqlx"))]
        let err = AppError::Database("pool closed".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access database");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
        assert!(!err.is_domain());
    }

    #[test]
    fn test_domain_errors_have_distinct_codes() {
        let errors = [
            AppError::NoUser("u".to_string()),
            AppError::NoGroup("g".to_string()),
            AppError::NoResource("r".to_string()),
            AppError::NoFile("f".to_string()),
            AppError::Forbidden("nope".to_string()),
            AppError::InvalidPermission,
            AppError::InvalidResourceType("image".to_string()),
            AppError::ResourceAlreadyExists("r".to_string()),
        ];

        let codes: std::collections::HashSet<_> = errors.iter().map(|e| e.error_code()).collect();
        assert_eq!(codes.len(), errors.len());

        for err in &errors {
            assert!(err.is_domain());
            assert!(!err.is_sensitive());
            assert!(!err.is_recoverable());
        }
    }

    #[test]
    fn test_domain_status_codes() {
        assert_eq!(AppError::NoGroup("g".into()).http_status_code(), 404);
        assert_eq!(AppError::Forbidden("x".into()).http_status_code(), 403);
        assert_eq!(AppError::InvalidPermission.http_status_code(), 400);
        assert_eq!(
            AppError::ResourceAlreadyExists("r".into()).http_status_code(),
            409
        );
        assert_eq!(
            AppError::IdentityProvider("down".into()).http_status_code(),
            502
        );
    }

    #[test]
    fn test_anyhow_keeps_context_chain() {
        let err: anyhow::Result<()> = Err(anyhow::anyhow!("connection reset"));
        let err = AppError::from(err.context("Failed to get group").unwrap_err());

        assert_eq!(err.error_code(), "INTERNAL_ERROR");
        assert_eq!(err.client_message(), "Internal server error");
        let detailed = err.detailed_message();
        assert!(detailed.contains("Failed to get group"));
        assert!(detailed.contains("connection reset"));
    }
}
