//! Scripted transport.

use boxoffice_core::request::{Method, RequestBody, RequestDescriptor};
use boxoffice_core::response::{ApiError, Payload, ResponseEnvelope};
use boxoffice_core::{Transport, TransportError};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Scripted reply of a [`MockTransport`] route.
#[derive(Debug, Clone)]
pub struct MockReply {
    outcome: Result<ResponseEnvelope, TransportError>,
    delay: Option<Duration>,
}

impl MockReply {
    /// Structured reply. Non-2xx statuses go through the same error decoding as
    /// a real error body.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let envelope = if is_success(status) {
            ResponseEnvelope::ok(status, Some(Payload::Json(body)))
        } else {
            ResponseEnvelope::failed(ApiError::from_body(status, &body.to_string(), None))
        };
        Self::from_envelope(envelope)
    }

    /// Plain-text reply.
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let envelope = if is_success(status) {
            ResponseEnvelope::ok(status, Some(Payload::Text(body)))
        } else {
            ResponseEnvelope::failed(ApiError::from_body(status, &body, None))
        };
        Self::from_envelope(envelope)
    }

    /// Reply with an empty body.
    #[must_use]
    pub fn status(status: u16) -> Self {
        let envelope = if is_success(status) {
            ResponseEnvelope::ok(status, None)
        } else {
            ResponseEnvelope::failed(ApiError::from_status(status, None))
        };
        Self::from_envelope(envelope)
    }

    /// Transport-level failure.
    #[must_use]
    pub const fn error(error: TransportError) -> Self {
        Self {
            outcome: Err(error),
            delay: None,
        }
    }

    /// Resolve only after `delay`.
    #[must_use]
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    const fn from_envelope(envelope: ResponseEnvelope) -> Self {
        Self {
            outcome: Ok(envelope),
            delay: None,
        }
    }
}

const fn is_success(status: u16) -> bool {
    matches!(status, 200..=299)
}

/// One request seen by a [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Method
    pub method: Method,
    /// Target as given by the caller
    pub target: String,
    /// Query parameters
    pub query: Vec<(String, String)>,
    /// Body
    pub body: Option<RequestBody>,
}

type Handler = Arc<dyn Fn(&RequestDescriptor) -> MockReply + Send + Sync>;

/// [`Transport`] answering from scripted routes.
///
/// Routes are keyed by method and exact target. Unrouted requests get a 404.
/// Every request is recorded before its reply is produced, so counts include
/// requests that are still in flight.
#[derive(Clone, Default)]
pub struct MockTransport {
    routes: Arc<Mutex<HashMap<(Method, String), Handler>>>,
    log: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockTransport {
    /// Create a transport with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `method target` to `handler`, replacing any earlier route.
    pub fn on<F>(&self, method: Method, target: impl Into<String>, handler: F)
    where
        F: Fn(&RequestDescriptor) -> MockReply + Send + Sync + 'static,
    {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((method, target.into()), Arc::new(handler));
    }

    /// Number of requests seen for `method target`.
    #[must_use]
    pub fn calls(&self, method: Method, target: &str) -> usize {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.method == method && r.target == target)
            .count()
    }

    /// Every request seen, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent request for `method target`.
    #[must_use]
    pub fn last_request(&self, method: Method, target: &str) -> Option<RecordedRequest> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|r| r.method == method && r.target == target)
            .cloned()
    }

    fn reply_for(&self, descriptor: &RequestDescriptor) -> MockReply {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                method: descriptor.method(),
                target: descriptor.target().to_string(),
                query: descriptor.query().to_vec(),
                body: descriptor.body().cloned(),
            });

        let handler = self
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(descriptor.method(), descriptor.target().to_string()))
            .cloned();

        match handler {
            Some(handler) => handler(descriptor),
            None => MockReply::json(
                404,
                serde_json::json!({
                    "message": format!("No mock route for {} {}", descriptor.method(), descriptor.target())
                }),
            ),
        }
    }
}

impl Transport for MockTransport {
    fn send(
        &self,
        descriptor: &RequestDescriptor,
    ) -> impl Future<Output = Result<ResponseEnvelope, TransportError>> + Send {
        let cancel = descriptor.cancel_token().cloned();
        let reply = if cancel.as_ref().is_some_and(|token| token.is_cancelled()) {
            MockReply::error(TransportError::Cancelled)
        } else {
            self.reply_for(descriptor)
        };

        async move {
            let respond = async move {
                if let Some(delay) = reply.delay {
                    tokio::time::sleep(delay).await;
                }
                reply.outcome
            };

            match cancel {
                Some(token) => tokio::select! {
                    biased;
                    () = token.cancelled() => Err(TransportError::Cancelled),
                    outcome = respond => outcome,
                },
                None => respond.await,
            }
        }
    }
}
