//! Response envelopes.
//!
//! Every transport call lands on a [`ResponseEnvelope`], whatever the wire
//! content type was. Failed responses carry an [`ApiError`] whose message is
//! chosen in this order:
//!
//! 1. the backend's `message` field
//! 2. the backend's `error` field
//! 3. a generic HTTP status message

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status code that signals an expired or invalid credential.
pub const STATUS_UNAUTHORIZED: u16 = 401;

/// Status code that signals a valid session lacking privilege.
pub const STATUS_FORBIDDEN: u16 = 403;

/// Decoded response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    /// Structured data
    Json(Value),
    /// Text-like body, decoded as UTF-8
    Text(String),
}

impl Payload {
    /// Decode the payload into `T`.
    ///
    /// Text payloads are parsed as JSON, so a backend that mislabels its
    /// content type still decodes.
    ///
    /// # Errors
    ///
    /// Returns the deserializer error if the payload does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match self {
            Self::Json(value) => T::deserialize(value),
            Self::Text(text) => serde_json::from_str(text),
        }
    }

    /// Text form of the payload.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(Value::String(text)) => Some(text),
            Self::Json(_) => None,
        }
    }
}

/// Normalized error of a non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message
    pub message: String,
    /// HTTP status code
    pub status: u16,
    /// Undecoded response body, if one was received
    pub raw_body: Option<String>,
}

impl ApiError {
    /// Build an error from a raw response body.
    ///
    /// `reason` is the canonical reason phrase of `status` (e.g. "Not Found"),
    /// used only when the body declares no message.
    ///
    /// # Example
    ///
    /// ```
    /// use boxoffice_core::ApiError;
    ///
    /// let err = ApiError::from_body(422, r#"{"message":"Invalid pincode"}"#, None);
    /// assert_eq!(err.message, "Invalid pincode");
    /// assert_eq!(err.status, 422);
    ///
    /// let err = ApiError::from_body(502, "<html>bad gateway</html>", Some("Bad Gateway"));
    /// assert_eq!(err.message, "HTTP 502: Bad Gateway");
    /// ```
    #[must_use]
    pub fn from_body(status: u16, raw: &str, reason: Option<&str>) -> Self {
        let declared = serde_json::from_str::<Value>(raw)
            .ok()
            .and_then(|value| declared_message(&value));

        Self {
            message: declared.unwrap_or_else(|| generic_message(status, reason)),
            status,
            raw_body: (!raw.is_empty()).then(|| raw.to_string()),
        }
    }

    /// Build an error with no body.
    #[must_use]
    pub fn from_status(status: u16, reason: Option<&str>) -> Self {
        Self {
            message: generic_message(status, reason),
            status,
            raw_body: None,
        }
    }
}

fn declared_message(value: &Value) -> Option<String> {
    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    };

    field("message").or_else(|| field("error")).or_else(|| {
        // `{ "error": { "message": "..." } }`
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}

fn generic_message(status: u16, reason: Option<&str>) -> String {
    match reason {
        Some(reason) if !reason.is_empty() => format!("HTTP {status}: {reason}"),
        _ => format!("Request failed with status {status}"),
    }
}

/// The normalized outcome of one transport call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// `true` for 2xx responses
    pub success: bool,
    /// HTTP status code
    pub status: u16,
    /// Decoded body of a successful response (`None` for empty bodies)
    pub data: Option<Payload>,
    /// Normalized error of a failed response
    pub error: Option<ApiError>,
}

impl ResponseEnvelope {
    /// Envelope for a 2xx response.
    #[must_use]
    pub const fn ok(status: u16, data: Option<Payload>) -> Self {
        Self {
            success: true,
            status,
            data,
            error: None,
        }
    }

    /// Envelope for a non-2xx response.
    #[must_use]
    pub const fn failed(error: ApiError) -> Self {
        Self {
            success: false,
            status: error.status,
            data: None,
            error: Some(error),
        }
    }

    /// Whether the response signals an authentication failure.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        !self.success && self.status == STATUS_UNAUTHORIZED
    }

    /// Decode the success payload into `T`.
    ///
    /// An empty body decodes as JSON `null`, so `T = ()` or `Option<_>` accept it.
    ///
    /// # Errors
    ///
    /// Returns the deserializer error if the payload does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.data {
            Some(payload) => payload.decode(),
            None => T::deserialize(Value::Null),
        }
    }
}
