//! HTTP transport core.
//!
//! [`HttpTransport`] issues one request with normalized headers and body
//! encoding, and normalizes whatever comes back onto a
//! [`ResponseEnvelope`]. It never retries and never looks at authentication.
//!
//! # Credentials
//!
//! Session cookies live in a cookie jar shared by every request to the backend
//! origin. Absolute targets on any other origin go through a second client that
//! has no cookie store, so the credential never leaves the backend origin.

use crate::config::ClientConfig;
use boxoffice_core::request::{FormField, Method, RequestBody, RequestDescriptor};
use boxoffice_core::response::{ApiError, Payload, ResponseEnvelope};
use boxoffice_core::{Transport, TransportError};
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use std::sync::Arc;

const ACCEPT_ANY: &str = "application/json, text/plain, */*";

/// Transport over `reqwest`.
#[derive(Clone)]
pub struct HttpTransport {
    config: Arc<ClientConfig>,
    base: Url,
    credentialed: Client,
    anonymous: Client,
    jar: Arc<Jar>,
}

impl HttpTransport {
    /// Create a transport for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::InvalidRequest` if the base URL does not parse or
    /// the HTTP clients cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let base = Url::parse(config.base_url())
            .map_err(|e| TransportError::InvalidRequest(format!("Invalid base URL: {e}")))?;

        let jar = Arc::new(Jar::default());

        let credentialed = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let anonymous = Client::builder()
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            config: Arc::new(config),
            base,
            credentialed,
            anonymous,
            jar,
        })
    }

    /// Cookie jar holding the ambient credential.
    #[must_use]
    pub fn cookie_jar(&self) -> Arc<Jar> {
        Arc::clone(&self.jar)
    }

    /// Configuration this transport was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn is_backend_origin(&self, url: &Url) -> bool {
        url.origin() == self.base.origin()
    }

    async fn execute(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<ResponseEnvelope, TransportError> {
        let url = Url::parse(&self.config.resolve(descriptor.target()))
            .map_err(|e| TransportError::InvalidRequest(format!("Invalid URL: {e}")))?;

        let client = if self.is_backend_origin(&url) {
            &self.credentialed
        } else {
            tracing::debug!(url = %url, "Foreign origin, sending without credentials");
            &self.anonymous
        };

        let mut request = client
            .request(to_reqwest_method(descriptor.method()), url.clone())
            .header(ACCEPT, ACCEPT_ANY);

        if !descriptor.query().is_empty() {
            request = request.query(descriptor.query());
        }

        if let Some(body) = descriptor.body() {
            request = match body {
                RequestBody::Json(value) => request.json(value),
                RequestBody::Text(text) => request
                    .header(CONTENT_TYPE, "text/plain; charset=utf-8")
                    .body(text.clone()),
                RequestBody::Bytes(bytes) => request.body(bytes.clone()),
                RequestBody::Multipart(fields) => request.multipart(build_form(fields)?),
            };
        }

        if let Some(timeout) = self.config.request_timeout {
            request = request.timeout(timeout);
        }

        metrics::counter!("client.requests").increment(1);
        tracing::debug!(method = %descriptor.method(), url = %url, "Sending request");

        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        tracing::debug!(
            method = %descriptor.method(),
            url = %url,
            status = status.as_u16(),
            "Response received"
        );

        if !status.is_success() {
            let raw = String::from_utf8_lossy(&bytes);
            return Ok(ResponseEnvelope::failed(ApiError::from_body(
                status.as_u16(),
                &raw,
                status.canonical_reason(),
            )));
        }

        Ok(ResponseEnvelope::ok(
            status.as_u16(),
            decode_success_body(&content_type, &bytes)?,
        ))
    }
}

impl Transport for HttpTransport {
    async fn send(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<ResponseEnvelope, TransportError> {
        match descriptor.cancel_token() {
            Some(token) => {
                if token.is_cancelled() {
                    return Err(TransportError::Cancelled);
                }
                tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        tracing::debug!(target_path = descriptor.target(), "Request cancelled");
                        Err(TransportError::Cancelled)
                    }
                    result = self.execute(descriptor) => result,
                }
            }
            None => self.execute(descriptor).await,
        }
    }
}

/// Decode a 2xx body: structured data for JSON content types, text otherwise.
fn decode_success_body(
    content_type: &str,
    bytes: &[u8],
) -> Result<Option<Payload>, TransportError> {
    if bytes.is_empty() {
        return Ok(None);
    }

    if content_type.contains("json") {
        let value = serde_json::from_slice(bytes)
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        return Ok(Some(Payload::Json(value)));
    }

    Ok(Some(Payload::Text(String::from_utf8_lossy(bytes).into_owned())))
}

fn build_form(fields: &[FormField]) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for field in fields {
        form = match field {
            FormField::Text { name, value } => form.text(name.clone(), value.clone()),
            FormField::File {
                name,
                filename,
                mime,
                bytes,
            } => {
                let mut part = Part::bytes(bytes.clone()).file_name(filename.clone());
                if let Some(mime) = mime {
                    part = part
                        .mime_str(mime)
                        .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
                }
                form.part(name.clone(), part)
            }
        };
    }
    Ok(form)
}

const fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::TimedOut
    } else if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_creation() {
        let transport = HttpTransport::new(ClientConfig::new("http://localhost:8080/api"));
        assert!(transport.is_ok());
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let transport = HttpTransport::new(ClientConfig::new("not a url"));
        assert!(matches!(transport, Err(TransportError::InvalidRequest(_))));
    }

    #[test]
    fn test_origin_check() {
        let Ok(transport) = HttpTransport::new(ClientConfig::new("https://tickets.example.com/api"))
        else {
            return;
        };
        let same = Url::parse("https://tickets.example.com/api/events").ok();
        let other = Url::parse("https://cdn.example.com/poster.png").ok();
        assert!(same.is_some_and(|u| transport.is_backend_origin(&u)));
        assert!(other.is_some_and(|u| !transport.is_backend_origin(&u)));
    }

    #[test]
    fn test_decode_success_body() {
        let json = decode_success_body("application/json; charset=utf-8", br#"{"ok":true}"#);
        assert!(matches!(json, Ok(Some(Payload::Json(_)))));

        let text = decode_success_body("text/plain", b"pong");
        assert_eq!(text, Ok(Some(Payload::Text("pong".to_string()))));

        let empty = decode_success_body("application/json", b"");
        assert_eq!(empty, Ok(None));

        let broken = decode_success_body("application/json", b"{nope");
        assert!(matches!(broken, Err(TransportError::Decode(_))));
    }

    #[test]
    fn test_multipart_form_rejects_bad_mime() {
        let fields = vec![FormField::File {
            name: "poster".to_string(),
            filename: "poster.png".to_string(),
            mime: Some("not a mime".to_string()),
            bytes: vec![0, 1, 2],
        }];
        assert!(build_form(&fields).is_err());
    }
}
