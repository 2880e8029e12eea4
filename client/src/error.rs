//! Error types for the boxoffice client.

use boxoffice_core::response::{STATUS_FORBIDDEN, STATUS_UNAUTHORIZED};
use boxoffice_core::{ApiError, TransportError};
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced to callers of the authenticated client.
///
/// Every HTTP-derived variant carries the status code and the normalized
/// message so a view can render it directly.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    // ═══════════════════════════════════════════════════════════
    // Transport Errors
    // ═══════════════════════════════════════════════════════════

    /// No response was obtained (network, DNS, CORS, cancelled, malformed input)
    #[error(transparent)]
    Transport(#[from] TransportError),

    // ═══════════════════════════════════════════════════════════
    // Session Errors
    // ═══════════════════════════════════════════════════════════

    /// Authentication failed and a refresh attempt could not recover it.
    ///
    /// The local session has already been torn down when this is returned.
    #[error("Session expired (status {status}): {message}")]
    AuthExpired {
        /// HTTP status code
        status: u16,
        /// Error message from the backend
        message: String,
    },

    // ═══════════════════════════════════════════════════════════
    // HTTP Errors
    // ═══════════════════════════════════════════════════════════

    /// Valid session, insufficient privilege
    #[error("Forbidden (status {status}): {message}")]
    Forbidden {
        /// HTTP status code
        status: u16,
        /// Error message from the backend
        message: String,
    },

    /// Validation or business failure
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the backend
        message: String,
        /// Undecoded response body
        raw_body: Option<String>,
    },

    /// Server failure (5xx)
    #[error("Server error (status {status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message from the backend
        message: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Payload Errors
    // ═══════════════════════════════════════════════════════════

    /// A successful response did not match the expected type
    #[error("Response parsing failed: {0}")]
    Decode(String),
}

impl ClientError {
    /// Classify a normalized API error.
    ///
    /// 401 becomes [`ClientError::AuthExpired`]; callers only build errors from
    /// a 401 once refresh has been tried.
    #[must_use]
    pub fn from_api(error: ApiError) -> Self {
        let ApiError {
            message,
            status,
            raw_body,
        } = error;

        match status {
            STATUS_UNAUTHORIZED => Self::AuthExpired { status, message },
            STATUS_FORBIDDEN => Self::Forbidden { status, message },
            500..=599 => Self::Server { status, message },
            _ => Self::Api {
                status,
                message,
                raw_body,
            },
        }
    }

    /// HTTP status code, if the error came from a response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::AuthExpired { status, .. }
            | Self::Forbidden { status, .. }
            | Self::Api { status, .. }
            | Self::Server { status, .. } => Some(*status),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }

    /// Whether the local session was torn down by this error.
    #[must_use]
    pub const fn is_session_invalid(&self) -> bool {
        matches!(self, Self::AuthExpired { .. })
    }

    /// Whether the request was cancelled rather than failed.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Cancelled))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let expired = ClientError::from_api(ApiError::from_status(401, Some("Unauthorized")));
        assert!(expired.is_session_invalid());

        let forbidden = ClientError::from_api(ApiError::from_status(403, None));
        assert!(matches!(forbidden, ClientError::Forbidden { status: 403, .. }));

        let server = ClientError::from_api(ApiError::from_status(503, None));
        assert!(matches!(server, ClientError::Server { status: 503, .. }));

        let body = r#"{"message":"Invalid pincode"}"#;
        let validation = ClientError::from_api(ApiError::from_body(422, body, None));
        assert_eq!(validation.status(), Some(422));
        assert_eq!(
            validation.to_string(),
            "API error (status 422): Invalid pincode"
        );
    }

    #[test]
    fn test_transport_errors_have_no_status() {
        let err = ClientError::from(TransportError::Cancelled);
        assert!(err.is_cancelled());
        assert_eq!(err.status(), None);
    }
}
