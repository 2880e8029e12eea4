//! Error types for the real-time channel.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for channel operations.
pub type Result<T> = std::result::Result<T, RealtimeError>;

/// Errors of the real-time channel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RealtimeError {
    /// No acknowledgement arrived in time
    #[error("No acknowledgement for '{event}' ({id}) within the timeout")]
    AckTimeout {
        /// Event name of the request
        event: String,
        /// Correlation id of the request
        id: Uuid,
    },

    /// The server acknowledged with a failure
    #[error("Request '{event}' rejected: {message}")]
    Rejected {
        /// Event name of the request
        event: String,
        /// Server message
        message: String,
    },

    /// The connection is gone
    #[error("Real-time channel closed")]
    Closed,
}
