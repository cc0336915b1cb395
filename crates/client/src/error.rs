use std::time::Duration;

use thiserror::Error;

/// Failure modes of a resilient HTTP call.
///
/// Whatever the retry budget, the caller always sees the *last* observed
/// error for the logical call.
#[derive(Debug, Error)]
pub enum HttpClientError {
    /// The attempt did not complete within the configured deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Transport-level failure (DNS, connect, TLS, reset).
    #[error("connection error: {0}")]
    Connection(String),

    /// The remote answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        /// The remote's `error` body field when present, else a generic
        /// status description.
        message: String,
    },

    /// The response body could not be decoded as the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The client itself could not be constructed.
    #[error("client configuration error: {0}")]
    Configuration(String),
}
