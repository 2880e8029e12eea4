//! Transport-level error types.

use thiserror::Error;

/// Failures that prevent a request from producing a response at all.
///
/// Ordinary HTTP failures (4xx, 5xx) are *not* transport errors: they come back
/// as a [`ResponseEnvelope`](crate::ResponseEnvelope) with `success == false`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Network unreachable, DNS failure, connection reset, CORS rejection
    #[error("Network error: {0}")]
    Network(String),

    /// The request could not be built (bad URL, unserializable body)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The response body could not be decoded as its declared content type
    #[error("Response decoding failed: {0}")]
    Decode(String),

    /// The request was cancelled through its [`CancelToken`](crate::CancelToken)
    #[error("Request cancelled")]
    Cancelled,

    /// The configured client-side timeout elapsed
    #[error("Request timed out")]
    TimedOut,
}

impl TransportError {
    /// Whether the error is a cancellation rather than a failure.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
