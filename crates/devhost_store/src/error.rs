//! Error types for document store operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or mutating a document.
///
/// A corrupt document on disk is deliberately absent from this list: reads
/// fall back to the empty/default state instead (see
/// [`crate::DocumentState::Corrupt`]).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Input is malformed or lacks a required field.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The operation requires a document that does not exist yet.
    #[error("document not found: {}", path.display())]
    NotFound {
        /// Path of the missing document.
        path: PathBuf,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A value could not be serialized to JSON.
    #[error("encode error: {0}")]
    Encode(String),
}

impl StoreError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns true if the caller is at fault (bad input or missing document).
    pub fn is_client_error(&self) -> bool {
        matches!(self, StoreError::Validation(_) | StoreError::NotFound { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            StoreError::Io(io::Error::new(io::ErrorKind::Other, err))
        } else {
            StoreError::Encode(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(StoreError::validation("missing name").is_client_error());
        assert!(StoreError::NotFound {
            path: PathBuf::from("filetree.json")
        }
        .is_client_error());
        assert!(!StoreError::Io(io::Error::new(io::ErrorKind::Other, "disk")).is_client_error());
    }

    #[test]
    fn error_display() {
        let err = StoreError::NotFound {
            path: PathBuf::from("filetree.json"),
        };
        assert_eq!(err.to_string(), "document not found: filetree.json");

        let err = StoreError::validation("expected array");
        assert_eq!(err.to_string(), "invalid input: expected array");
    }
}
