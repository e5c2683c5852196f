//! Error types for litmine.

use thiserror::Error;

/// Result type alias using litmine's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for litmine operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed job parameters, rejected at submission
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Term index operation failed
    #[error("Index error: {0}")]
    Index(String),

    /// Document store operation failed
    #[error("Store error: {0}")]
    Store(String),

    /// Job queue misuse (illegal transition, duplicate claim)
    #[error("Job error: {0}")]
    Job(String),

    /// Job id not known to the store
    #[error("Job not found: {0}")]
    JobNotFound(uuid::Uuid),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// External dependency did not answer in time
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cooperative cancellation was observed at a checkpoint
    #[error("Cancelled")]
    Cancelled,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
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

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("b_terms must be non-empty".to_string());
        assert_eq!(err.to_string(), "Invalid input: b_terms must be non-empty");
    }

    #[test]
    fn test_error_display_index() {
        let err = Error::Index("postings unavailable".to_string());
        assert_eq!(err.to_string(), "Index error: postings unavailable");
    }

    #[test]
    fn test_error_display_job() {
        let err = Error::Job("already terminal".to_string());
        assert_eq!(err.to_string(), "Job error: already terminal");
    }

    #[test]
    fn test_error_display_job_not_found() {
        let id = Uuid::nil();
        let err = Error::JobNotFound(id);
        assert_eq!(err.to_string(), format!("Job not found: {}", id));
    }

    #[test]
    fn test_error_display_timeout() {
        let err = Error::Timeout("cluster did not finish within 6h".to_string());
        assert_eq!(err.to_string(), "Timeout: cluster did not finish within 6h");
    }

    #[test]
    fn test_error_display_cancelled() {
        assert_eq!(Error::Cancelled.to_string(), "Cancelled");
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
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_result_type_ok() {
        fn get_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(get_result().unwrap(), 42);
    }
}
