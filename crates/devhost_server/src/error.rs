//! Error types for the development server.

use devhost_store::StoreError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while serving a request.
#[derive(Error, Debug)]
pub enum ServerError {
    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No route or file matches the request.
    #[error("not found: {0}")]
    NotRoutable(String),

    /// The method is not supported.
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    /// The request body exceeds the configured limit.
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The listener could not be bound.
    #[error("failed to bind: {0}")]
    Bind(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Returns the HTTP status for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::Store(StoreError::Validation(_)) => 400,
            ServerError::Store(StoreError::NotFound { .. }) => 404,
            ServerError::Store(_) => 500,
            ServerError::NotRoutable(_) => 404,
            ServerError::MethodNotAllowed(_) => 405,
            ServerError::PayloadTooLarge { .. } => 413,
            ServerError::Bind(_) | ServerError::Io(_) => 500,
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn status_mapping() {
        let validation = ServerError::from(StoreError::validation("expected array"));
        assert_eq!(validation.status_code(), 400);

        let missing = ServerError::from(StoreError::NotFound {
            path: PathBuf::from("filetree.json"),
        });
        assert_eq!(missing.status_code(), 404);

        let io = ServerError::from(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )));
        assert_eq!(io.status_code(), 500);

        assert_eq!(ServerError::NotRoutable("/x".into()).status_code(), 404);
        assert_eq!(ServerError::MethodNotAllowed("PATCH".into()).status_code(), 405);
        assert_eq!(ServerError::PayloadTooLarge { limit: 1 }.status_code(), 413);
    }

    #[test]
    fn error_classification() {
        assert!(ServerError::NotRoutable("/x".into()).is_client_error());
        assert!(ServerError::Bind("in use".into()).is_server_error());
        assert!(!ServerError::Bind("in use".into()).is_client_error());
    }

    #[test]
    fn store_errors_display_transparently() {
        let err = ServerError::from(StoreError::validation("expected array"));
        assert_eq!(err.to_string(), "invalid input: expected array");
    }
}
