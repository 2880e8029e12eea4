//! Session state and the memoized session cache.
//!
//! [`SessionState`] is the process-wide home of the Session Record: the
//! resolved record, the single in-flight identity resolution, and the
//! client-side storage mirror. Only [`SessionCache`] and the orchestrator
//! write to it.
//!
//! # Lifecycle
//!
//! | Event | Record | In-flight resolution | Storage mirror |
//! |---|---|---|---|
//! | identity resolves | set | cleared | written |
//! | identity fails (non-auth) | cleared | cleared | untouched |
//! | [`SessionState::invalidate`] | cleared | cleared | untouched |
//! | [`SessionState::expire`] (terminal 401) | cleared | kept | cleared |
//! | [`SessionState::teardown`] (logout) | cleared | cleared | cleared |
//!
//! Every resolution carries an epoch. A resolution that settles after it was
//! superseded (forced refresh, invalidation) still answers its own waiters but
//! leaves the state alone.

use crate::error::{ClientError, Result};
use crate::orchestrator::AuthenticatedClient;
use boxoffice_core::request::RequestDescriptor;
use boxoffice_core::{Role, SessionRecord, SessionStorage, Transport};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

type SessionFuture = Shared<BoxFuture<'static, Result<SessionRecord>>>;

const KEY_IS_AUTHENTICATED: &str = "isAuthenticated";
const KEY_ROLE: &str = "role";
const KEY_PROFILE: &str = "profile";

/// Non-authoritative session hint read from the storage mirror.
///
/// Lets a view render before the identity query resolves. Never use it for
/// access control.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionHint {
    /// Last known authentication flag
    pub is_authenticated: bool,
    /// Last known role
    pub role: Option<Role>,
    /// Last known serialized profile
    pub profile: Option<Value>,
}

struct InFlight {
    epoch: u64,
    future: SessionFuture,
}

#[derive(Default)]
struct Inner {
    record: Option<SessionRecord>,
    in_flight: Option<InFlight>,
    epoch: u64,
}

impl Inner {
    fn begin(&mut self, start: impl FnOnce(u64) -> SessionFuture) -> SessionFuture {
        self.epoch += 1;
        let epoch = self.epoch;
        let future = start(epoch);
        self.in_flight = Some(InFlight {
            epoch,
            future: future.clone(),
        });
        future
    }
}

/// Process-wide session state.
pub struct SessionState {
    storage: Arc<dyn SessionStorage>,
    prefix: String,
    inner: Mutex<Inner>,
}

impl SessionState {
    /// Create empty session state mirroring into `storage` under `prefix`.
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>, prefix: impl Into<String>) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// The resolved record, if any.
    #[must_use]
    pub fn record(&self) -> Option<SessionRecord> {
        self.lock().record.clone()
    }

    /// Whether an identity resolution is in flight.
    #[must_use]
    pub fn is_resolving(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    /// Read the storage mirror.
    #[must_use]
    pub fn hint(&self) -> SessionHint {
        SessionHint {
            is_authenticated: self
                .storage
                .get(&self.key(KEY_IS_AUTHENTICATED))
                .is_some_and(|v| v == "true"),
            role: self
                .storage
                .get(&self.key(KEY_ROLE))
                .map(|r| Role::normalize(&r)),
            profile: self
                .storage
                .get(&self.key(KEY_PROFILE))
                .and_then(|p| serde_json::from_str(&p).ok()),
        }
    }

    /// Drop the record and any in-flight resolution. The next
    /// [`SessionCache::get_session`] resolves from scratch.
    pub fn invalidate(&self) {
        let mut inner = self.lock();
        inner.record = None;
        inner.in_flight = None;
        inner.epoch += 1;
        drop(inner);
        tracing::debug!("Session invalidated");
    }

    /// Terminal authentication failure: drop the record and clear the mirror.
    ///
    /// An in-flight resolution is kept; it settles to an unauthenticated record
    /// on its own.
    pub fn expire(&self) {
        self.lock().record = None;
        self.clear_mirror();
        tracing::info!("Session expired");
    }

    /// Full local teardown (logout).
    pub fn teardown(&self) {
        self.invalidate();
        self.clear_mirror();
        tracing::info!("Session torn down");
    }

    fn settle(&self, epoch: u64, outcome: &Result<SessionRecord>) {
        let mut inner = self.lock();
        if inner.in_flight.as_ref().is_none_or(|f| f.epoch != epoch) {
            tracing::debug!(epoch, "Superseded session resolution settled, ignoring");
            return;
        }

        inner.in_flight = None;
        match outcome {
            Ok(record) => {
                inner.record = Some(record.clone());
                drop(inner);
                self.write_mirror(record);
            }
            Err(_) => {
                inner.record = None;
            }
        }
    }

    fn write_mirror(&self, record: &SessionRecord) {
        if !record.is_authenticated {
            self.clear_mirror();
            return;
        }

        self.storage.set(&self.key(KEY_IS_AUTHENTICATED), "true");
        self.storage.set(&self.key(KEY_ROLE), record.role.as_str());

        let profile = serde_json::json!({
            "user": record.user,
            "profile": record.profile,
        });
        self.storage.set(&self.key(KEY_PROFILE), &profile.to_string());
    }

    fn clear_mirror(&self) {
        for key in [KEY_IS_AUTHENTICATED, KEY_ROLE, KEY_PROFILE] {
            self.storage.remove(&self.key(key));
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Memoized "who is the current user" resolution.
///
/// N simultaneous callers produce exactly one identity request.
pub struct SessionCache<T> {
    client: AuthenticatedClient<T>,
    identity_path: String,
    resolutions: Arc<AtomicU64>,
}

impl<T> SessionCache<T>
where
    T: Transport + 'static,
{
    /// Create a cache resolving through `GET {identity_path}`.
    #[must_use]
    pub fn new(client: AuthenticatedClient<T>, identity_path: impl Into<String>) -> Self {
        Self {
            client,
            identity_path: identity_path.into(),
            resolutions: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Resolve the current session.
    ///
    /// Without `force_refresh`, returns the cached record or joins the
    /// in-flight resolution. With it, always starts a new resolution.
    ///
    /// An identity query that ends in an authentication failure (after the
    /// orchestrator's refresh attempt) resolves to an unauthenticated record.
    ///
    /// # Errors
    ///
    /// Any other failure is returned to every caller sharing the resolution,
    /// and the next call starts over.
    pub async fn get_session(&self, force_refresh: bool) -> Result<SessionRecord> {
        let state = self.client.session_state();

        let future = {
            let mut inner = state.lock();
            if force_refresh {
                inner.begin(|epoch| self.resolve(epoch))
            } else if let Some(record) = inner.record.as_ref() {
                return Ok(record.clone());
            } else if let Some(in_flight) = inner.in_flight.as_ref() {
                tracing::debug!(epoch = in_flight.epoch, "Joining in-flight session resolution");
                in_flight.future.clone()
            } else {
                inner.begin(|epoch| self.resolve(epoch))
            }
        };

        future.await
    }

    /// Number of identity requests started since creation.
    #[must_use]
    pub fn resolution_count(&self) -> u64 {
        self.resolutions.load(Ordering::SeqCst)
    }

    /// The shared session state.
    #[must_use]
    pub fn state(&self) -> &Arc<SessionState> {
        self.client.session_state()
    }

    fn resolve(&self, epoch: u64) -> SessionFuture {
        let client = self.client.clone();
        let state: Weak<SessionState> = Arc::downgrade(self.client.session_state());
        let resolutions = Arc::clone(&self.resolutions);
        let descriptor = RequestDescriptor::get(self.identity_path.clone());

        async move {
            resolutions.fetch_add(1, Ordering::SeqCst);
            metrics::counter!("client.session.resolutions").increment(1);
            tracing::debug!(epoch, "Resolving session");

            let outcome = match client.request(&descriptor).await {
                Ok(envelope) => envelope
                    .decode::<Value>()
                    .map_err(ClientError::from)
                    .and_then(|payload| {
                        SessionRecord::from_identity_payload(&payload)
                            .map_err(|e| ClientError::Decode(e.to_string()))
                    }),
                Err(ClientError::AuthExpired { .. }) => {
                    tracing::info!(epoch, "Identity query unauthenticated");
                    Ok(SessionRecord::unauthenticated())
                }
                Err(err) => {
                    tracing::warn!(epoch, error = %err, "Session resolution failed");
                    Err(err)
                }
            };

            if let Some(state) = state.upgrade() {
                state.settle(epoch, &outcome);
            }

            if let Ok(record) = &outcome {
                tracing::info!(
                    epoch,
                    authenticated = record.is_authenticated,
                    role = %record.role,
                    "Session resolved"
                );
            }

            outcome
        }
        .boxed()
        .shared()
    }
}
