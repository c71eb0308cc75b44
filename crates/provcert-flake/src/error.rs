//! Error types for flake corpus queries.

use std::time::Duration;
use thiserror::Error;

/// Errors from a single flake corpus query.
#[derive(Debug, Error)]
pub enum FlakeError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The corpus answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body was not the expected JSON.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The request did not complete within the per-request timeout.
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// The pool deadline elapsed before the query was issued.
    #[error("Deadline exceeded before query was issued")]
    DeadlineExceeded,

    /// The worker task running the query died.
    #[error("Query task failed: {0}")]
    TaskFailed(String),

    /// The configured base URL is unusable.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Result type for flake corpus operations.
pub type FlakeResult<T> = Result<T, FlakeError>;
