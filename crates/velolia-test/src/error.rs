//! Test error types.

use thiserror::Error;

/// Errors raised while building a request or reading a response.
#[derive(Debug, Error)]
pub enum TestError {
    /// The request could not be built.
    #[error("Request build error: {0}")]
    RequestBuild(String),

    /// The response body could not be read.
    #[error("Body read error: {0}")]
    BodyRead(String),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A header name or value was rejected.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}
