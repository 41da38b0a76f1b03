//! Centralized error types for ordermatch.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the ordermatch library.
#[derive(Error, Debug)]
pub enum OrderMatchError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A `position` or `quantity` value in the transcript is not an integer.
    /// Aborts the whole parse.
    #[error("Malformed field at line {line}: '{key}' expects an integer, got '{value}'")]
    MalformedField {
        line: usize,
        key: String,
        value: String,
    },

    /// An order-number pattern failed to compile.
    #[error("Invalid pattern '{name}': {reason}")]
    InvalidPattern { name: String, reason: String },

    /// Configuration required by an external service is absent.
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// The extraction service answered with nothing.
    #[error("Empty response from extraction service")]
    EmptyResponse,

    /// The extraction service answered with invalid JSON or JSON that
    /// does not conform to the order schema.
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// A renderer or extraction service failed.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for `Result<T, OrderMatchError>`.
pub type Result<T> = std::result::Result<T, OrderMatchError>;

impl OrderMatchError {
    /// Create an `Io` variant from a path and an `io::Error`.
    ///
    /// `NotFound` is mapped to [`OrderMatchError::FileNotFound`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::FileNotFound(path);
        }
        Self::Io { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_not_found_maps_to_file_not_found() {
        let err = OrderMatchError::io(
            "missing.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "nope"),
        );
        assert!(matches!(err, OrderMatchError::FileNotFound(_)));
    }

    #[test]
    fn test_io_other_kind_keeps_path() {
        let err = OrderMatchError::io(
            "locked.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, OrderMatchError::Io { .. }));
        assert!(err.to_string().contains("locked.txt"), "{err}");
    }

    #[test]
    fn test_malformed_field_message() {
        let err = OrderMatchError::MalformedField {
            line: 4,
            key: "quantity".to_string(),
            value: "two".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed field at line 4: 'quantity' expects an integer, got 'two'"
        );
    }
}
