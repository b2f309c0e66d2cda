//! Test error types.

use thiserror::Error;

/// Errors raised while building a test request or reading its response.
#[derive(Debug, Error)]
pub enum TestError {
    /// The request could not be built.
    #[error("failed to build request: {0}")]
    RequestBuild(String),

    /// The response body could not be read as requested.
    #[error("failed to read body: {0}")]
    BodyRead(String),

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A header name or value was invalid.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}
