//! Single-flight session refresh.
//!
//! # States
//!
//! - **Idle**: no exchange in flight. The next caller starts one.
//! - **Refreshing**: an exchange is in flight. Callers join it as waiters and
//!   receive its result.
//!
//! The coordinator returns to Idle whatever the outcome, so a failed refresh
//! never blocks later ones.
//!
//! The in-flight exchange is a [`Shared`] future parked in a slot. Every caller
//! awaits a clone of it, so the exchange keeps making progress even if the
//! caller that started it goes away.

use boxoffice_core::request::RequestDescriptor;
use boxoffice_core::Transport;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type RefreshFuture = Shared<BoxFuture<'static, bool>>;

/// Refresh coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// No exchange in flight
    Idle,
    /// An exchange is in flight
    Refreshing,
}

struct InFlight {
    id: u64,
    future: RefreshFuture,
}

/// Ensures at most one refresh exchange is in flight.
pub struct RefreshCoordinator<T> {
    transport: Arc<T>,
    refresh_path: String,
    in_flight: Arc<Mutex<Option<InFlight>>>,
    next_id: AtomicU64,
    exchanges: Arc<AtomicU64>,
}

impl<T> RefreshCoordinator<T>
where
    T: Transport + 'static,
{
    /// Create a coordinator that refreshes through `POST {refresh_path}`.
    #[must_use]
    pub fn new(transport: Arc<T>, refresh_path: impl Into<String>) -> Self {
        Self {
            transport,
            refresh_path: refresh_path.into(),
            in_flight: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(0),
            exchanges: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Renew the session.
    ///
    /// Returns `true` if the session was renewed. Network failures count as
    /// `false`. Concurrent callers share one exchange and one result.
    pub async fn refresh(&self) -> bool {
        let future = {
            let mut slot = self
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            if let Some(in_flight) = slot.as_ref() {
                metrics::counter!("client.refresh.waiters").increment(1);
                tracing::debug!(exchange = in_flight.id, "Joining in-flight session refresh");
                in_flight.future.clone()
            } else {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                let future = self.start_exchange(id);
                *slot = Some(InFlight {
                    id,
                    future: future.clone(),
                });
                future
            }
        };

        future.await
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> RefreshState {
        let slot = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    /// Number of refresh exchanges actually sent since creation.
    #[must_use]
    pub fn exchange_count(&self) -> u64 {
        self.exchanges.load(Ordering::SeqCst)
    }

    /// Forget any in-flight exchange.
    ///
    /// Callers already waiting keep their clone and still get its result.
    pub fn reset(&self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn start_exchange(&self, id: u64) -> RefreshFuture {
        let transport = Arc::clone(&self.transport);
        let slot = Arc::clone(&self.in_flight);
        let exchanges = Arc::clone(&self.exchanges);
        let descriptor = RequestDescriptor::post(self.refresh_path.clone());

        async move {
            exchanges.fetch_add(1, Ordering::SeqCst);
            metrics::counter!("client.refresh.exchanges").increment(1);
            tracing::info!(exchange = id, "Refreshing session");

            let renewed = match transport.send(&descriptor).await {
                Ok(envelope) if envelope.success => true,
                Ok(envelope) => {
                    tracing::warn!(
                        exchange = id,
                        status = envelope.status,
                        "Session refresh rejected"
                    );
                    false
                }
                Err(err) => {
                    tracing::warn!(exchange = id, error = %err, "Session refresh failed");
                    false
                }
            };

            // Back to Idle, unless a reset already replaced this exchange.
            let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.as_ref().is_some_and(|in_flight| in_flight.id == id) {
                slot.take();
            }
            drop(slot);

            tracing::info!(exchange = id, renewed, "Session refresh finished");
            renewed
        }
        .boxed()
        .shared()
    }
}
