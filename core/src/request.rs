//! Request descriptors.
//!
//! A [`RequestDescriptor`] is built once and then only read: the orchestrator
//! sends the very same descriptor again when it retries after a session refresh.

use crate::cancel::CancelToken;
use serde::Serialize;
use std::fmt;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
    /// `HEAD`
    Head,
}

impl Method {
    /// Whether requests with this method are expected to carry a body.
    ///
    /// Only these methods get the "missing body" diagnostic.
    #[must_use]
    pub const fn expects_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }

    /// Upper-case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormField {
    /// Plain text field
    Text {
        /// Field name
        name: String,
        /// Field value
        value: String,
    },
    /// File upload
    File {
        /// Field name
        name: String,
        /// File name reported to the server
        filename: String,
        /// MIME type, if known
        mime: Option<String>,
        /// File contents
        bytes: Vec<u8>,
    },
}

/// Request body.
///
/// Only [`RequestBody::Json`] makes the transport set a content type. Binary and
/// multipart bodies negotiate their own content type.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Structured body, sent as `application/json`
    Json(serde_json::Value),
    /// Plain text body
    Text(String),
    /// Raw bytes with no content type
    Bytes(Vec<u8>),
    /// `multipart/form-data` (boundary chosen by the transport)
    Multipart(Vec<FormField>),
}

impl RequestBody {
    /// Serialize any value into a JSON body.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if `value` cannot be represented as JSON.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::Json)
    }

    /// Whether this body is encoded as serialized structured data.
    #[must_use]
    pub const fn is_structured(&self) -> bool {
        matches!(self, Self::Json(_))
    }
}

/// Everything needed to issue one request.
///
/// # Example
///
/// ```
/// use boxoffice_core::request::{Method, RequestBody, RequestDescriptor};
/// use serde_json::json;
///
/// let descriptor = RequestDescriptor::new(Method::Post, "orders")
///     .with_body(RequestBody::Json(json!({ "event": "evt-1", "quantity": 2 })));
///
/// assert!(descriptor.body().is_some());
/// assert!(descriptor.cancel_token().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    target: String,
    method: Method,
    query: Vec<(String, String)>,
    body: Option<RequestBody>,
    cancel: Option<CancelToken>,
}

impl RequestDescriptor {
    /// Create a descriptor for `method` on `target`.
    ///
    /// `target` is a resource path relative to the configured base URL, or an
    /// absolute `http(s)://` URL.
    #[must_use]
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            method,
            query: Vec::new(),
            body: None,
            cancel: None,
        }
    }

    /// Shorthand for a `GET` descriptor.
    #[must_use]
    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::Get, target)
    }

    /// Shorthand for a `POST` descriptor.
    #[must_use]
    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::Post, target)
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append several query parameters.
    #[must_use]
    pub fn with_query_pairs<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Attach a body.
    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Resource path or absolute URL.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Query parameters in insertion order.
    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Body, if any.
    #[must_use]
    pub const fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Cancellation token, if any.
    #[must_use]
    pub const fn cancel_token(&self) -> Option<&CancelToken> {
        self.cancel.as_ref()
    }

    /// Whether this descriptor is a mutating request without a body.
    #[must_use]
    pub const fn is_missing_body(&self) -> bool {
        self.method.expects_body() && self.body.is_none()
    }
}
