//! Explicitly constructed client context.
//!
//! A [`ClientContext`] owns everything that is process-wide in a running
//! application: the transport, the refresh coordinator and the session state.
//! Tests build one per test, so nothing leaks between them.
//!
//! # Lifecycle
//!
//! - [`ClientContext::init`]: build the stack
//! - [`ClientContext::invalidate`]: forget the resolved session, keep the mirror
//! - [`ClientContext::teardown`]: forget the session and clear the mirror
//! - [`ClientContext::logout`]: tell the backend (best effort), then tear down

use crate::api::{realtime_token, EventListQuery, EventsApi, RealtimeToken};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::orchestrator::AuthenticatedClient;
use crate::refresh::RefreshCoordinator;
use crate::session::{SessionCache, SessionHint, SessionState};
use crate::transport::HttpTransport;
use boxoffice_core::request::RequestDescriptor;
use boxoffice_core::{SessionRecord, SessionStorage, Transport, TransportError};
use boxoffice_runtime::debounce::DebounceConfig;
use std::sync::Arc;

/// The wired data-access stack.
pub struct ClientContext<T = HttpTransport> {
    config: Arc<ClientConfig>,
    client: AuthenticatedClient<T>,
    sessions: SessionCache<T>,
}

impl ClientContext<HttpTransport> {
    /// Build a context over a real HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidRequest`] if the configured base URL is
    /// unusable.
    pub fn connect(
        config: ClientConfig,
        storage: Arc<dyn SessionStorage>,
    ) -> std::result::Result<Self, TransportError> {
        let transport = HttpTransport::new(config.clone())?;
        Ok(Self::init(config, transport, storage))
    }
}

impl<T> ClientContext<T>
where
    T: Transport + 'static,
{
    /// Wire a context over `transport`.
    pub fn init(config: ClientConfig, transport: T, storage: Arc<dyn SessionStorage>) -> Self {
        let transport = Arc::new(transport);
        let session = Arc::new(SessionState::new(storage, config.storage_prefix.clone()));
        let refresh = Arc::new(RefreshCoordinator::new(
            Arc::clone(&transport),
            config.refresh_path.clone(),
        ));
        let client = AuthenticatedClient::new(transport, refresh, session);
        let sessions = SessionCache::new(client.clone(), config.identity_path.clone());

        tracing::info!(base_url = config.base_url(), "Client context initialized");

        Self {
            config: Arc::new(config),
            client,
            sessions,
        }
    }

    /// The authenticated client.
    #[must_use]
    pub const fn client(&self) -> &AuthenticatedClient<T> {
        &self.client
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Event endpoints.
    #[must_use]
    pub fn events(&self) -> EventsApi<T> {
        EventsApi::new(self.client.clone())
    }

    /// A debounced, stale-safe events list.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn event_list(&self, debounce: DebounceConfig) -> EventListQuery {
        EventListQuery::new(self.events(), debounce)
    }

    /// Resolve the current session. See [`SessionCache::get_session`].
    ///
    /// # Errors
    ///
    /// Any failure other than "not authenticated".
    pub async fn session(&self, force_refresh: bool) -> Result<SessionRecord> {
        self.sessions.get_session(force_refresh).await
    }

    /// Non-authoritative session hint from the storage mirror.
    #[must_use]
    pub fn hint(&self) -> SessionHint {
        self.client.session_state().hint()
    }

    /// Fetch a real-time channel token.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`](crate::error::ClientError) of the request.
    pub async fn realtime_token(&self) -> Result<RealtimeToken> {
        realtime_token(&self.client, &self.config.realtime_token_path).await
    }

    /// Forget the resolved session; the storage mirror stays.
    pub fn invalidate(&self) {
        self.client.session_state().invalidate();
    }

    /// Forget the session, clear the storage mirror and any in-flight refresh.
    pub fn teardown(&self) {
        self.client.refresh_coordinator().reset();
        self.client.session_state().teardown();
    }

    /// Log out: `POST {logout_path}` then [`teardown`](Self::teardown).
    ///
    /// The backend call is best effort. Its failures are logged and local
    /// teardown happens regardless.
    pub async fn logout(&self) {
        let descriptor = RequestDescriptor::post(self.config.logout_path.clone());

        match self.client.transport().send(&descriptor).await {
            Ok(envelope) if envelope.success => tracing::info!("Logged out"),
            Ok(envelope) => {
                tracing::warn!(
                    status = envelope.status,
                    "Logout rejected by backend, clearing locally"
                );
            }
            Err(err) => tracing::warn!(error = %err, "Logout request failed, clearing locally"),
        }

        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxoffice_core::Method;
    use boxoffice_testing::{fixtures, MemoryStorage, MockReply, MockTransport};

    fn context(transport: MockTransport) -> (ClientContext<MockTransport>, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let context = ClientContext::init(
            ClientConfig::new("http://localhost:8080/api"),
            transport,
            storage.clone(),
        );
        (context, storage)
    }

    fn signed_in_transport() -> MockTransport {
        let transport = MockTransport::new();
        transport.on(Method::Get, "auth/me", |_| {
            MockReply::json(200, fixtures::identity_payload("u-1", "user"))
        });
        transport
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_backend_fails() {
        let transport = signed_in_transport();
        transport.on(Method::Post, "auth/logout", |_| MockReply::status(500));
        let (context, storage) = context(transport.clone());

        let _ = context.session(false).await;
        assert!(context.hint().is_authenticated);

        context.logout().await;

        assert!(storage.is_empty());
        assert!(!context.hint().is_authenticated);
        assert_eq!(transport.calls(Method::Post, "auth/logout"), 1);
    }

    #[tokio::test]
    async fn test_invalidate_keeps_mirror_but_refetches() {
        let transport = signed_in_transport();
        let (context, storage) = context(transport.clone());

        let _ = context.session(false).await;
        context.invalidate();
        assert!(!storage.is_empty());

        let _ = context.session(false).await;
        assert_eq!(transport.calls(Method::Get, "auth/me"), 2);
    }

    #[tokio::test]
    async fn test_contexts_do_not_share_state() {
        let (first, _) = context(signed_in_transport());
        let (second, second_storage) = context(MockTransport::new());

        let _ = first.session(false).await;
        assert!(first.hint().is_authenticated);
        assert!(second_storage.is_empty());
        assert!(second.client().session_state().record().is_none());
    }

    #[tokio::test]
    async fn test_realtime_token_uses_configured_path() {
        let transport = MockTransport::new();
        transport.on(Method::Get, "realtime/token", |_| {
            MockReply::json(
                200,
                serde_json::json!({ "token": "rt-1", "expiresAt": "2026-10-16T12:00:00Z" }),
            )
        });
        let (context, _) = context(transport);

        let token = context.realtime_token().await;
        assert_eq!(token.map(|t| t.token), Ok("rt-1".to_string()));
    }

    #[tokio::test]
    async fn test_event_list_loads_through_context() {
        let transport = MockTransport::new();
        transport.on(Method::Get, "events", |_| {
            MockReply::json(
                200,
                fixtures::event_page(vec![fixtures::event_summary("evt-1", "Jazz night")], 1, 1),
            )
        });
        let (context, _) = context(transport.clone());

        let list = context.event_list(DebounceConfig::default());
        let mut receiver = list.subscribe();
        list.refetch();

        let state = receiver
            .wait_for(|state| state.generation == 1 && !state.loading)
            .await
            .map(|state| state.clone());
        assert_eq!(
            state.ok().and_then(|s| s.data).map(|page| page.items.len()),
            Some(1)
        );
        assert_eq!(transport.calls(Method::Get, "events"), 1);
    }
}
