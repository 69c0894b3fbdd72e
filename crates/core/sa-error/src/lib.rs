//! Error types for s3audit.
//!
//! This crate provides:
//! - [`ScanError`] - Top-level error enum for scan and dump pipelines
//! - [`Result`] - Result alias used across the workspace
//!
//! Failures scoped to one bucket or one object are converted into result
//! variants by the orchestrators and never propagate past that unit of work.
//! Only [`ScanError::Config`] is fatal to a whole run.

use thiserror::Error;

/// Top-level error type for s3audit.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Bucket name violates the provider's naming rules. Raised before any
    /// network call is issued.
    #[error("invalid bucket name: {0}")]
    InvalidName(String),

    /// The existence probe returned a status the resolver does not know how
    /// to interpret. Fatal for the single bucket, never for the batch.
    #[error("unhandled response status {status} for bucket {bucket} in {region}")]
    UnhandledResponse {
        status: u16,
        bucket: String,
        region: String,
    },

    /// Dump precondition failure: no identity has read access.
    #[error("no read permission for bucket {0}")]
    NoReadPermission(String),

    /// Configuration errors (bad destination directory, no input names).
    /// These abort the whole run.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network or storage-backend failure, carried as text with the
    /// underlying cause attached.
    #[error("provider error: {0}")]
    Provider(String),

    /// An object key that would resolve outside the dump destination root.
    /// The object is skipped, never written.
    #[error("object key escapes the destination root: {0}")]
    UnsafeObjectKey(String),

    /// Local filesystem errors during dump.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors (wrapped anyhow)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScanError {
    /// Whether this error should abort the whole run rather than a single
    /// bucket's pipeline.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(self, ScanError::Config(_))
    }
}

/// Result type alias using ScanError.
pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_name_display() {
        let err = ScanError::InvalidName("Bad_Bucket".to_string());
        assert_eq!(err.to_string(), "invalid bucket name: Bad_Bucket");
    }

    #[test]
    fn test_unhandled_response_display() {
        let err = ScanError::UnhandledResponse {
            status: 418,
            bucket: "teapot".to_string(),
            region: "us-east-1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("418"));
        assert!(msg.contains("teapot"));
        assert!(msg.contains("us-east-1"));
    }

    #[test]
    fn test_only_config_is_fatal_for_run() {
        assert!(ScanError::Config("no input".to_string()).is_fatal_for_run());
        assert!(!ScanError::InvalidName("x".to_string()).is_fatal_for_run());
        assert!(!ScanError::NoReadPermission("b".to_string()).is_fatal_for_run());
        assert!(!ScanError::Provider("timeout".to_string()).is_fatal_for_run());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ScanError = io.into();
        assert!(matches!(err, ScanError::Io(_)));
    }
}
