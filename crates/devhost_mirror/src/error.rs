//! Error types for mirror operations.

use std::fmt;
use thiserror::Error;

/// Result type for mirror operations.
pub type MirrorResult<T> = Result<T, MirrorError>;

/// Which request of a put failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Fetching the current content hash.
    Lookup,
    /// Writing the new content.
    Put,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Lookup => f.write_str("lookup"),
            Stage::Put => f.write_str("put"),
        }
    }
}

/// Errors raised while mirroring a file to the remote.
///
/// None of these ever reach the HTTP caller whose write triggered the
/// mirror; the worker logs them and moves on.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Network or transport failure (DNS, TLS, timeout, reset).
    #[error("transport error during {stage}: {message}")]
    Transport {
        /// Request that failed.
        stage: Stage,
        /// Error message.
        message: String,
    },

    /// The remote answered with an unexpected status.
    #[error("remote returned {status} during {stage}: {body}")]
    Status {
        /// Request that failed.
        stage: Stage,
        /// HTTP status code.
        status: u16,
        /// Start of the response body.
        body: String,
    },

    /// The remote answered with a body we could not understand.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The mirror configuration is invalid.
    #[error("invalid mirror configuration: {0}")]
    Config(String),
}

impl MirrorError {
    /// Returns the HTTP status of a status error.
    pub fn status(&self) -> Option<u16> {
        match self {
            MirrorError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the remote rejected a stale content hash.
    pub fn is_conflict(&self) -> bool {
        matches!(self.status(), Some(409) | Some(422))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = MirrorError::Status {
            stage: Stage::Lookup,
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "remote returned 500 during lookup: boom");
        assert_eq!(err.status(), Some(500));
        assert!(!err.is_conflict());
    }

    #[test]
    fn conflicts_are_recognized() {
        let err = MirrorError::Status {
            stage: Stage::Put,
            status: 409,
            body: String::new(),
        };
        assert!(err.is_conflict());
        assert!(!MirrorError::Protocol("x".into()).is_conflict());
    }
}
