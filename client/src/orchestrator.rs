//! Authenticated request orchestration.
//!
//! ```text
//! request ──► transport ──► 2xx ───────────────────────────────► Ok(envelope)
//!                   │
//!                   ├─► 401 (first attempt) ─► refresh ─► true ─► transport (once more)
//!                   │                              │
//!                   │                              └─► false ─► clear session ─► AuthExpired
//!                   │
//!                   └─► other non-2xx ─────────────────────────► typed error
//! ```
//!
//! A 401 on the retried attempt is not refreshed again: the local session is
//! cleared and the caller gets [`ClientError::AuthExpired`]. Redirecting to a
//! sign-in page is the view layer's job.

use crate::error::{ClientError, Result};
use crate::refresh::RefreshCoordinator;
use crate::session::SessionState;
use boxoffice_core::request::RequestDescriptor;
use boxoffice_core::response::{ApiError, ResponseEnvelope};
use boxoffice_core::Transport;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Wraps a transport with transparent re-authentication.
pub struct AuthenticatedClient<T> {
    transport: Arc<T>,
    refresh: Arc<RefreshCoordinator<T>>,
    session: Arc<SessionState>,
}

impl<T> Clone for AuthenticatedClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            refresh: Arc::clone(&self.refresh),
            session: Arc::clone(&self.session),
        }
    }
}

impl<T> AuthenticatedClient<T>
where
    T: Transport + 'static,
{
    /// Create an orchestrator over shared transport, coordinator and session state.
    #[must_use]
    pub const fn new(
        transport: Arc<T>,
        refresh: Arc<RefreshCoordinator<T>>,
        session: Arc<SessionState>,
    ) -> Self {
        Self {
            transport,
            refresh,
            session,
        }
    }

    /// Send a request, refreshing the session once on authentication failure.
    ///
    /// The returned envelope is always a successful one.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Transport`]: no response (network, cancelled, malformed)
    /// - [`ClientError::AuthExpired`]: 401 that a refresh could not fix
    /// - [`ClientError::Forbidden`], [`ClientError::Api`], [`ClientError::Server`]:
    ///   any other non-2xx status, never refreshed
    pub async fn request(&self, descriptor: &RequestDescriptor) -> Result<ResponseEnvelope> {
        if descriptor.is_missing_body() {
            tracing::warn!(
                method = %descriptor.method(),
                target_path = descriptor.target(),
                "Mutating request sent without a body"
            );
        }

        let first = self.transport.send(descriptor).await?;
        if !first.is_auth_failure() {
            return into_result(first);
        }

        tracing::debug!(
            target_path = descriptor.target(),
            "Authentication failed, attempting session refresh"
        );

        let final_response = if self.refresh.refresh().await {
            self.transport.send(descriptor).await?
        } else {
            first
        };

        if final_response.is_auth_failure() {
            tracing::warn!(
                target_path = descriptor.target(),
                "Authentication could not be recovered, clearing session"
            );
            self.session.expire();
        }

        into_result(final_response)
    }

    /// Send a request and decode the payload into `R`.
    ///
    /// # Errors
    ///
    /// Same as [`request`](Self::request), plus [`ClientError::Decode`] if the
    /// payload does not match `R`.
    pub async fn request_json<R: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<R> {
        let envelope = self.request(descriptor).await?;
        Ok(envelope.decode()?)
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// The shared refresh coordinator.
    #[must_use]
    pub fn refresh_coordinator(&self) -> &Arc<RefreshCoordinator<T>> {
        &self.refresh
    }

    /// The shared session state.
    #[must_use]
    pub fn session_state(&self) -> &Arc<SessionState> {
        &self.session
    }
}

fn into_result(envelope: ResponseEnvelope) -> Result<ResponseEnvelope> {
    if envelope.success {
        return Ok(envelope);
    }

    let status = envelope.status;
    let error = envelope
        .error
        .unwrap_or_else(|| ApiError::from_status(status, None));
    Err(ClientError::from_api(error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use boxoffice_core::{Method, SessionStorage, TransportError};
    use boxoffice_testing::{MemoryStorage, MockReply, MockTransport};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn client(
        transport: &Arc<MockTransport>,
    ) -> (AuthenticatedClient<MockTransport>, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let session = Arc::new(SessionState::new(storage.clone(), "boxoffice."));
        let refresh = Arc::new(RefreshCoordinator::new(Arc::clone(transport), "auth/refresh"));
        (
            AuthenticatedClient::new(Arc::clone(transport), refresh, session),
            storage,
        )
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::Get, "events", |_| MockReply::json(200, json!([])));

        let (client, _) = client(&transport);
        let envelope = client.request(&RequestDescriptor::get("events")).await;
        assert!(envelope.is_ok_and(|e| e.success));
        assert_eq!(transport.calls(Method::Post, "auth/refresh"), 0);
    }

    #[tokio::test]
    async fn test_401_refreshes_and_retries_once() {
        let transport = Arc::new(MockTransport::new());
        let renewed = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&renewed);
        transport.on(Method::Get, "orders", move |_| {
            if flag.load(Ordering::SeqCst) {
                MockReply::json(200, json!({ "orders": [] }))
            } else {
                MockReply::status(401)
            }
        });
        let flag = Arc::clone(&renewed);
        transport.on(Method::Post, "auth/refresh", move |_| {
            flag.store(true, Ordering::SeqCst);
            MockReply::status(204)
        });

        let (client, _) = client(&transport);
        let result = client.request(&RequestDescriptor::get("orders")).await;

        assert!(result.is_ok());
        assert_eq!(transport.calls(Method::Get, "orders"), 2);
        assert_eq!(transport.calls(Method::Post, "auth/refresh"), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_surfaces_auth_expired_and_clears_storage() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::Get, "orders", |_| MockReply::status(401));
        transport.on(Method::Post, "auth/refresh", |_| MockReply::status(401));

        let (client, storage) = client(&transport);
        storage.set("boxoffice.isAuthenticated", "true");
        storage.set("boxoffice.role", "ADMIN");

        let result = client.request(&RequestDescriptor::get("orders")).await;

        assert!(matches!(result, Err(ClientError::AuthExpired { status: 401, .. })));
        assert_eq!(transport.calls(Method::Get, "orders"), 1);
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_second_401_is_not_refreshed_again() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::Get, "orders", |_| MockReply::status(401));
        transport.on(Method::Post, "auth/refresh", |_| MockReply::status(200));

        let (client, _) = client(&transport);
        let result = client.request(&RequestDescriptor::get("orders")).await;

        assert!(result.is_err_and(|e| e.is_session_invalid()));
        assert_eq!(transport.calls(Method::Get, "orders"), 2);
        assert_eq!(transport.calls(Method::Post, "auth/refresh"), 1);
    }

    #[tokio::test]
    async fn test_403_never_refreshes() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::Delete, "events/evt-1", |_| {
            MockReply::json(403, json!({ "message": "Organizers only" }))
        });

        let (client, _) = client(&transport);
        let result = client
            .request(&RequestDescriptor::new(Method::Delete, "events/evt-1"))
            .await;

        assert_eq!(
            result.err(),
            Some(ClientError::Forbidden {
                status: 403,
                message: "Organizers only".to_string()
            })
        );
        assert_eq!(transport.calls(Method::Post, "auth/refresh"), 0);
    }

    #[tokio::test]
    async fn test_server_errors_are_not_retried() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::Get, "events", |_| MockReply::status(503));

        let (client, _) = client(&transport);
        let result = client.request(&RequestDescriptor::get("events")).await;

        assert!(matches!(result, Err(ClientError::Server { status: 503, .. })));
        assert_eq!(transport.calls(Method::Get, "events"), 1);
    }

    #[tokio::test]
    async fn test_transport_errors_propagate() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::Get, "events", |_| {
            MockReply::error(TransportError::Network("dns".to_string()))
        });

        let (client, _) = client(&transport);
        let result = client.request(&RequestDescriptor::get("events")).await;
        assert!(matches!(result, Err(ClientError::Transport(TransportError::Network(_)))));
    }

    #[tokio::test]
    async fn test_request_json_decodes_payload() {
        #[derive(serde::Deserialize)]
        struct Count {
            total: u32,
        }

        let transport = Arc::new(MockTransport::new());
        transport.on(Method::Get, "events/count", |_| MockReply::json(200, json!({ "total": 12 })));

        let (client, _) = client(&transport);
        let count: Result<Count> = client
            .request_json(&RequestDescriptor::get("events/count"))
            .await;
        assert_eq!(count.map(|c| c.total), Ok(12));
    }
}
