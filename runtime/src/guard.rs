//! Request generation guard.
//!
//! One [`QueryGuard`] per logical query site ("list events for these filters",
//! "event detail"). Issuing a query:
//!
//! 1. cancels the previous in-flight query of the site,
//! 2. increments the generation and captures it in a [`Ticket`],
//! 3. runs the operation,
//! 4. applies the result only if the ticket's generation is still current.
//!
//! A stale result is discarded unconditionally. It does not clear `loading`,
//! since that flag now belongs to the newer query.
//!
//! # Example
//!
//! ```
//! use boxoffice_runtime::guard::QueryGuard;
//!
//! let guard: QueryGuard<u32> = QueryGuard::new("counter");
//!
//! let first = guard.issue();
//! let second = guard.issue();
//! assert!(first.cancel_token().is_cancelled());
//!
//! assert!(!guard.complete(&first, Ok::<_, String>(1)).is_applied());
//! assert!(guard.complete(&second, Ok::<_, String>(2)).is_applied());
//! assert_eq!(guard.state().data, Some(2));
//! ```

use boxoffice_core::CancelToken;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// UI-facing state of one query site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState<T> {
    /// A query of the current generation is in flight
    pub loading: bool,
    /// Data of the last applied success
    pub data: Option<T>,
    /// Message of the last applied failure
    pub error: Option<String>,
    /// Generation of the most recently issued query
    pub generation: u64,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            loading: false,
            data: None,
            error: None,
            generation: 0,
        }
    }
}

/// Outcome of completing a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome<T, E> {
    /// The result belonged to the current generation and was applied
    Applied(Result<T, E>),
    /// A newer query was issued; the result was discarded
    Stale {
        /// Generation of the discarded result
        generation: u64,
        /// Generation current when it arrived
        current: u64,
    },
}

impl<T, E> QueryOutcome<T, E> {
    /// Whether the result was applied.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// The applied result, if any.
    #[must_use]
    pub fn applied(self) -> Option<Result<T, E>> {
        match self {
            Self::Applied(result) => Some(result),
            Self::Stale { .. } => None,
        }
    }
}

/// Handle for one issued query.
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    cancel: CancelToken,
}

impl Ticket {
    /// Generation captured when the query was issued.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Token cancelled as soon as a newer query is issued.
    #[must_use]
    pub const fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

#[derive(Default)]
struct Control {
    generation: u64,
    in_flight: Option<CancelToken>,
}

struct Site<T> {
    name: String,
    control: Mutex<Control>,
    state: watch::Sender<QueryState<T>>,
}

/// Generation counter plus cancellation for one query site.
///
/// Clones share the same site.
pub struct QueryGuard<T> {
    site: Arc<Site<T>>,
}

impl<T> Clone for QueryGuard<T> {
    fn clone(&self) -> Self {
        Self {
            site: Arc::clone(&self.site),
        }
    }
}

impl<T> QueryGuard<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a guard for the named query site.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            site: Arc::new(Site {
                name: name.into(),
                control: Mutex::new(Control::default()),
                state: watch::Sender::new(QueryState::default()),
            }),
        }
    }

    /// Start a new query: cancel the previous one and bump the generation.
    pub fn issue(&self) -> Ticket {
        let mut control = self.lock();
        if let Some(previous) = control.in_flight.take() {
            previous.cancel();
        }

        control.generation += 1;
        let generation = control.generation;
        let cancel = CancelToken::new();
        control.in_flight = Some(cancel.clone());

        self.site.state.send_modify(|state| {
            state.loading = true;
            state.generation = generation;
        });
        drop(control);

        tracing::debug!(site = %self.site.name, generation, "Query issued");
        Ticket { generation, cancel }
    }

    /// Deliver the result of an issued query.
    ///
    /// Applies it if `ticket` is still the current generation, discards it
    /// otherwise.
    pub fn complete<E: Display>(
        &self,
        ticket: &Ticket,
        result: Result<T, E>,
    ) -> QueryOutcome<T, E> {
        let mut control = self.lock();
        let current = control.generation;

        if ticket.generation != current {
            drop(control);
            metrics::counter!("query.stale_discarded").increment(1);
            tracing::debug!(
                site = %self.site.name,
                generation = ticket.generation,
                current,
                "Discarding stale query result"
            );
            return QueryOutcome::Stale {
                generation: ticket.generation,
                current,
            };
        }

        control.in_flight = None;
        self.site.state.send_modify(|state| {
            state.loading = false;
            match &result {
                Ok(data) => {
                    state.data = Some(data.clone());
                    state.error = None;
                }
                Err(err) => state.error = Some(err.to_string()),
            }
        });
        drop(control);

        if let Err(err) = &result {
            tracing::debug!(
                site = %self.site.name,
                generation = current,
                error = %err,
                "Query failed"
            );
        }

        QueryOutcome::Applied(result)
    }

    /// Issue a query, run `op` with its cancellation token, and complete it.
    pub async fn run<F, Fut, E>(&self, op: F) -> QueryOutcome<T, E>
    where
        F: FnOnce(CancelToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let ticket = self.issue();
        let result = op(ticket.cancel.clone()).await;
        self.complete(&ticket, result)
    }

    /// Abandon the site: cancel the in-flight query and make its result stale.
    ///
    /// Called when the owning view goes away.
    pub fn cancel(&self) {
        let mut control = self.lock();
        if let Some(previous) = control.in_flight.take() {
            previous.cancel();
        }
        control.generation += 1;
        let generation = control.generation;

        self.site.state.send_modify(|state| {
            state.loading = false;
            state.generation = generation;
        });
    }

    /// Generation of the most recently issued query.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Snapshot of the site state.
    #[must_use]
    pub fn state(&self) -> QueryState<T> {
        self.site.state.borrow().clone()
    }

    /// Observe state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.site.state.subscribe()
    }

    /// Name of the query site.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.site.name
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Control> {
        self.site
            .control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tokio::sync::oneshot;

    #[test]
    fn test_generation_increments_per_issue() {
        let guard: QueryGuard<u32> = QueryGuard::new("events");
        assert_eq!(guard.generation(), 0);

        let ticket = guard.issue();
        assert_eq!(ticket.generation(), 1);
        assert!(guard.state().loading);

        let _ = guard.issue();
        assert_eq!(guard.generation(), 2);
    }

    #[tokio::test]
    async fn test_out_of_order_result_is_discarded() {
        let guard: QueryGuard<&'static str> = QueryGuard::new("events");
        let (a_tx, a_rx) = oneshot::channel::<&'static str>();
        let (b_tx, b_rx) = oneshot::channel::<&'static str>();

        let a = tokio::spawn({
            let guard = guard.clone();
            async move { guard.run(|_| async move { a_rx.await.map_err(|e| e.to_string()) }).await }
        });
        tokio::task::yield_now().await;
        assert_eq!(guard.generation(), 1);

        let b = tokio::spawn({
            let guard = guard.clone();
            async move { guard.run(|_| async move { b_rx.await.map_err(|e| e.to_string()) }).await }
        });
        tokio::task::yield_now().await;
        assert_eq!(guard.generation(), 2);

        // B resolves first, then the slow A.
        let _ = b_tx.send("B");
        let b_outcome = b.await.ok();
        let _ = a_tx.send("A");
        let a_outcome = a.await.ok();

        assert_eq!(b_outcome, Some(QueryOutcome::Applied(Ok("B"))));
        assert_eq!(
            a_outcome,
            Some(QueryOutcome::Stale {
                generation: 1,
                current: 2
            })
        );

        let state = guard.state();
        assert_eq!(state.data, Some("B"));
        assert!(!state.loading);
    }

    #[test]
    fn test_run_stays_loading_until_operation_resolves() {
        let guard: QueryGuard<u32> = QueryGuard::new("events");
        let (tx, rx) = oneshot::channel::<u32>();

        let mut run = tokio_test::task::spawn(
            guard.run(|_| async move { rx.await.map_err(|e| e.to_string()) }),
        );
        tokio_test::assert_pending!(run.poll());
        assert!(guard.state().loading);

        let _ = tx.send(9);
        assert!(run.is_woken());
        let outcome = tokio_test::assert_ready!(run.poll());
        assert_eq!(outcome, QueryOutcome::Applied(Ok(9)));
        assert!(!guard.state().loading);
    }

    #[test]
    fn test_stale_result_does_not_clear_loading() {
        let guard: QueryGuard<u32> = QueryGuard::new("events");
        let old = guard.issue();
        let _new = guard.issue();

        let outcome = guard.complete(&old, Err::<u32, _>("timeout"));
        assert!(!outcome.is_applied());

        let state = guard.state();
        assert!(state.loading);
        assert_eq!(state.error, None);
    }

    #[test]
    fn test_issue_cancels_previous_token() {
        let guard: QueryGuard<u32> = QueryGuard::new("events");
        let first = guard.issue();
        assert!(!first.cancel_token().is_cancelled());

        let second = guard.issue();
        assert!(first.cancel_token().is_cancelled());
        assert!(!second.cancel_token().is_cancelled());
    }

    #[test]
    fn test_applied_failure_keeps_previous_data() {
        let guard: QueryGuard<u32> = QueryGuard::new("events");
        let ticket = guard.issue();
        let _ = guard.complete(&ticket, Ok::<_, String>(7));

        let ticket = guard.issue();
        let outcome = guard.complete(&ticket, Err::<u32, _>("HTTP 500"));
        assert_eq!(outcome.applied(), Some(Err("HTTP 500")));

        let state = guard.state();
        assert_eq!(state.data, Some(7));
        assert_eq!(state.error.as_deref(), Some("HTTP 500"));
        assert!(!state.loading);
    }

    #[test]
    fn test_cancel_makes_in_flight_result_stale() {
        let guard: QueryGuard<u32> = QueryGuard::new("events");
        let ticket = guard.issue();

        guard.cancel();
        assert!(ticket.cancel_token().is_cancelled());
        assert!(!guard.state().loading);
        assert!(!guard.complete(&ticket, Ok::<_, String>(1)).is_applied());
    }

    #[tokio::test]
    async fn test_subscribers_observe_applied_state() {
        let guard: QueryGuard<u32> = QueryGuard::new("events");
        let mut receiver = guard.subscribe();

        let _ = guard.run(|_| async { Ok::<_, String>(5) }).await;

        assert!(receiver.has_changed().unwrap_or(false));
        assert_eq!(receiver.borrow_and_update().data, Some(5));
    }

    proptest! {
        #[test]
        fn prop_only_latest_ticket_applies(count in 1usize..20, pick in 0usize..20) {
            let guard: QueryGuard<usize> = QueryGuard::new("events");
            let tickets: Vec<Ticket> = (0..count).map(|_| guard.issue()).collect();
            let pick = pick % count;

            let outcome = guard.complete(&tickets[pick], Ok::<_, String>(pick));
            prop_assert_eq!(outcome.is_applied(), pick == count - 1);
            prop_assert_eq!(guard.state().data.is_some(), pick == count - 1);
        }
    }
}
