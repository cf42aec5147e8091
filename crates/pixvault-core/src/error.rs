//! Error types module
//!
//! All errors are unified under the `AppError` enum, which covers database,
//! blob-storage, queue, validation, and media-processing failures.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx`
//! feature; with `default-features = false` the variant carries a plain string.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

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

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unrecognized picture or video file: {0}")]
    UnrecognizedMedia(String),

    #[error("Store inconsistency: {0}")]
    StoreInconsistency(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Media conversion error: {0}")]
    MediaConversion(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Short machine-readable name of the variant, used in log fields.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::Queue(_) => "Queue",
            AppError::Validation(_) => "Validation",
            AppError::NotFound(_) => "NotFound",
            AppError::UnrecognizedMedia(_) => "UnrecognizedMedia",
            AppError::StoreInconsistency(_) => "StoreInconsistency",
            AppError::ImageProcessing(_) => "ImageProcessing",
            AppError::MediaConversion(_) => "MediaConversion",
            AppError::Internal(_) => "Internal",
        }
    }

    /// Whether retrying the failed operation can reasonably succeed.
    ///
    /// Used by job handlers to decide between requeue and surfacing the error:
    /// infrastructure failures are transient, validation failures are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Storage(_) | AppError::Queue(_)
        )
    }
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::Validation(format!("UUID parsing error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(AppError::Storage("disk full".to_string()).is_transient());
        assert!(AppError::Queue("publish failed".to_string()).is_transient());
        assert!(!AppError::Validation("bad extension".to_string()).is_transient());
        assert!(!AppError::UnrecognizedMedia("x.jpg".to_string()).is_transient());
    }

    #[test]
    fn error_type_names() {
        assert_eq!(
            AppError::NotFound("folder".to_string()).error_type(),
            "NotFound"
        );
        assert_eq!(
            AppError::StoreInconsistency("orphan blob".to_string()).error_type(),
            "StoreInconsistency"
        );
    }

    #[test]
    fn io_error_converts_to_internal() {
        let err: AppError = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
