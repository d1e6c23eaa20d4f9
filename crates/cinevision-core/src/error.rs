//! Error types module
//!
//! All errors are unified under the `AppError` enum, which carries enough
//! metadata (via `ErrorMetadata`) for the HTTP layer to render a stable,
//! machine-readable response without matching on variants itself.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx`
//! feature so non-database crates can depend on the core without pulling in
//! the driver.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected errors such as validation failures
    Debug,
    /// Recoverable or suspicious conditions worth surfacing
    Warn,
    /// Unexpected failures
    Error,
}

/// Metadata describing how an error should be presented over HTTP.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g. "AMOUNT_MISMATCH")
    fn error_code(&self) -> &'static str;

    /// Whether the caller may retry
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from the internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Stale webhook request: timestamp {declared} outside tolerance of {tolerance_secs}s")]
    StaleRequest {
        declared: i64,
        tolerance_secs: i64,
    },

    #[error("Illegal state transition: {from} -> {to} on {entity} {id}")]
    IllegalStateTransition {
        entity: &'static str,
        id: String,
        from: String,
        to: String,
    },

    #[error("Amount mismatch: expected {expected_cents} cents, webhook declared {declared_cents}")]
    AmountMismatch {
        expected_cents: i64,
        declared_cents: i64,
    },

    #[error("Incomplete parts: expected {expected} contiguous parts, {reason}")]
    IncompleteParts { expected: i32, reason: String },

    #[error("A pending purchase for this content already exists")]
    DuplicatePendingPurchase,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Notification delivery failed: {0}")]
    NotificationFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
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

impl From<crate::signature::SignatureError> for AppError {
    fn from(err: crate::signature::SignatureError) -> Self {
        use crate::signature::SignatureError;
        match err {
            SignatureError::StaleTimestamp {
                declared,
                tolerance_secs,
            } => AppError::StaleRequest {
                declared,
                tolerance_secs,
            },
            SignatureError::InvalidSecret => {
                AppError::Internal("Webhook signing secret is invalid".to_string())
            }
            _ => AppError::InvalidSignature,
        }
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, sensitive, log_level).
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, bool, LogLevel) {
    match err {
        AppError::Database(_) => (500, "DATABASE_ERROR", true, true, LogLevel::Error),
        AppError::Storage(_) => (500, "STORAGE_ERROR", true, true, LogLevel::Error),
        AppError::InvalidInput(_) => (400, "VALIDATION_ERROR", false, false, LogLevel::Debug),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, false, LogLevel::Debug),
        AppError::InvalidSignature => (401, "INVALID_SIGNATURE", false, false, LogLevel::Warn),
        AppError::StaleRequest { .. } => (401, "STALE_REQUEST", false, false, LogLevel::Warn),
        // Providers redeliver out of order; the webhook surface answers 200
        // for these, so the status code here only applies to direct API use.
        AppError::IllegalStateTransition { .. } => {
            (409, "ILLEGAL_STATE_TRANSITION", false, false, LogLevel::Warn)
        }
        AppError::AmountMismatch { .. } => (400, "AMOUNT_MISMATCH", false, false, LogLevel::Warn),
        AppError::IncompleteParts { .. } => (400, "INCOMPLETE_PARTS", false, false, LogLevel::Debug),
        AppError::DuplicatePendingPurchase => {
            (409, "DUPLICATE_PENDING_PURCHASE", false, false, LogLevel::Debug)
        }
        AppError::Unauthorized(_) => (401, "UNAUTHORIZED", false, false, LogLevel::Debug),
        AppError::NotificationFailed(_) => {
            (502, "NOTIFICATION_FAILED", true, false, LogLevel::Warn)
        }
        AppError::Internal(_) => (500, "INTERNAL_ERROR", true, true, LogLevel::Error),
        AppError::InternalWithSource { .. } => (500, "INTERNAL_ERROR", true, true, LogLevel::Error),
    }
}

impl AppError {
    /// Error type name for detailed error responses
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::InvalidSignature => "InvalidSignature",
            AppError::StaleRequest { .. } => "StaleRequest",
            AppError::IllegalStateTransition { .. } => "IllegalStateTransition",
            AppError::AmountMismatch { .. } => "AmountMismatch",
            AppError::IncompleteParts { .. } => "IncompleteParts",
            AppError::DuplicatePendingPurchase => "DuplicatePendingPurchase",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::NotificationFailed(_) => "NotificationFailed",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Detailed error message including the source chain
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

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::InvalidSignature => "Invalid webhook signature".to_string(),
            AppError::StaleRequest { .. } => "Webhook timestamp outside tolerance".to_string(),
            AppError::IllegalStateTransition { from, to, .. } => {
                format!("Transition {} -> {} is not allowed", from, to)
            }
            AppError::AmountMismatch {
                expected_cents,
                declared_cents,
            } => format!(
                "Amount mismatch: expected {} cents, got {}",
                expected_cents, declared_cents
            ),
            AppError::IncompleteParts { expected, reason } => {
                format!("Upload parts incomplete ({} expected): {}", expected, reason)
            }
            AppError::DuplicatePendingPurchase => {
                "A pending purchase for this content already exists".to_string()
            }
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::NotificationFailed(_) => "Notification delivery failed".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_amount_mismatch() {
        let err = AppError::AmountMismatch {
            expected_cents: 698,
            declared_cents: 1,
        };
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "AMOUNT_MISMATCH");
        assert!(!err.is_recoverable());
        assert!(err.client_message().contains("698"));
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_error_metadata_invalid_signature() {
        let err = AppError::InvalidSignature;
        assert_eq!(err.http_status_code(), 401);
        assert_eq!(err.error_code(), "INVALID_SIGNATURE");
        assert!(!err.is_recoverable());
        assert!(!err.is_sensitive());
    }

    #[test]
    fn test_error_metadata_not_found() {
        let err = AppError::NotFound("Content abc not found".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert_eq!(err.client_message(), "Content abc not found");
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_illegal_transition() {
        let err = AppError::IllegalStateTransition {
            entity: "payment",
            id: "42".to_string(),
            from: "paid".to_string(),
            to: "pending".to_string(),
        };
        assert_eq!(err.error_code(), "ILLEGAL_STATE_TRANSITION");
        assert!(err.client_message().contains("paid"));
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let source = anyhow::anyhow!("connection refused");
        let err = AppError::InternalWithSource {
            message: "startup failed".to_string(),
            source,
        };
        let details = err.detailed_message();
        assert!(details.contains("Caused by: connection refused"));
    }
}
