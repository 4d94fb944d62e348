//! Error types for outbound calls to the monitored service.

use thiserror::Error;

/// Failure of a single outbound request.
///
/// The loop treats every variant the same way (log and continue), but the
/// reason is preserved so a future backoff policy can key on it.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("base URL {0:?} has no usable host")]
    InvalidBaseUrl(String),

    #[error("failed to build request: {0}")]
    InvalidRequest(#[from] http::Error),

    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("http handshake failed: {0}")]
    Handshake(#[source] hyper::Error),

    #[error("request failed: {0}")]
    Request(#[source] hyper::Error),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("unexpected status {0}")]
    Status(http::StatusCode),

    #[error("failed to read response body: {0}")]
    Body(#[source] hyper::Error),

    #[error("malformed response body: {0}")]
    Deserialize(#[from] serde_json::Error),
}
