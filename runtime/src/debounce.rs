//! Debounced refetch controller.
//!
//! | Trigger | Behavior |
//! |---|---|
//! | search text change | fire after `quiet_interval`; another keystroke restarts the delay |
//! | any other filter | fire now, back to page 1 |
//! | clear all | fire now with defaults |
//! | page change | fire now, filters untouched |
//! | search shorter than `min_search_len` but not empty | no request |
//!
//! Every dispatch reads the filters from the shared [`LatestCell`] at the
//! moment it fires, so a delayed fire always sends the newest parameters.

use crate::cell::LatestCell;
use crate::filters::{FilterKey, ListFilters};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Debounce configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceConfig {
    /// Quiet period after the last search keystroke
    pub quiet_interval: Duration,
    /// Minimum search length (in characters) worth a request
    pub min_search_len: usize,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            quiet_interval: Duration::from_millis(350),
            min_search_len: 2,
        }
    }
}

impl DebounceConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub const fn builder() -> DebounceConfigBuilder {
        DebounceConfigBuilder {
            quiet_interval: None,
            min_search_len: None,
        }
    }
}

/// Builder for [`DebounceConfig`].
#[derive(Debug, Clone)]
pub struct DebounceConfigBuilder {
    quiet_interval: Option<Duration>,
    min_search_len: Option<usize>,
}

impl DebounceConfigBuilder {
    /// Set the quiet interval.
    #[must_use]
    pub const fn quiet_interval(mut self, interval: Duration) -> Self {
        self.quiet_interval = Some(interval);
        self
    }

    /// Set the minimum search length.
    #[must_use]
    pub const fn min_search_len(mut self, len: usize) -> Self {
        self.min_search_len = Some(len);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> DebounceConfig {
        let defaults = DebounceConfig::default();
        DebounceConfig {
            quiet_interval: self.quiet_interval.unwrap_or(defaults.quiet_interval),
            min_search_len: self.min_search_len.unwrap_or(defaults.min_search_len),
        }
    }
}

/// What a filter update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The query fired immediately
    Fired,
    /// The query will fire after the quiet interval
    Scheduled,
    /// Search text too short, nothing sent
    Suppressed,
}

type FireFn = dyn Fn(ListFilters) + Send + Sync;

/// Turns filter mutations into query dispatches.
///
/// The `fire` callback receives the filters to query with. Typically it
/// spawns a [`QueryGuard::run`](crate::guard::QueryGuard::run).
///
/// Scheduling uses `tokio::spawn`, so updates must happen inside a Tokio
/// runtime. Dropping the controller cancels a pending fire.
pub struct RefetchController {
    config: DebounceConfig,
    filters: LatestCell<ListFilters>,
    fire: Arc<FireFn>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl RefetchController {
    /// Create a controller starting from default filters.
    pub fn new<F>(config: DebounceConfig, fire: F) -> Self
    where
        F: Fn(ListFilters) + Send + Sync + 'static,
    {
        Self::with_filters(config, ListFilters::default(), fire)
    }

    /// Create a controller starting from `initial` filters.
    pub fn with_filters<F>(config: DebounceConfig, initial: ListFilters, fire: F) -> Self
    where
        F: Fn(ListFilters) + Send + Sync + 'static,
    {
        Self::with_cell(config, LatestCell::new(initial), fire)
    }

    /// Create a controller writing through an existing filter cell.
    ///
    /// The query started by `fire` can read the same cell when it sends.
    pub fn with_cell<F>(config: DebounceConfig, filters: LatestCell<ListFilters>, fire: F) -> Self
    where
        F: Fn(ListFilters) + Send + Sync + 'static,
    {
        Self {
            config,
            filters,
            fire: Arc::new(fire),
            pending: Mutex::new(None),
        }
    }

    /// Change one filter.
    pub fn update_filter(&self, key: FilterKey, value: impl Into<String>) -> Dispatch {
        self.cancel_pending();
        let filters = self.filters.update(|filters| {
            filters.set(key, value);
            filters.page = 1;
        });

        if key != FilterKey::Search {
            self.dispatch_now(filters);
            return Dispatch::Fired;
        }

        if filters.search.trim().is_empty() {
            self.dispatch_now(filters);
            return Dispatch::Fired;
        }

        if !filters.search_ready(self.config.min_search_len) {
            tracing::trace!(
                len = filters.search.chars().count(),
                min = self.config.min_search_len,
                "Search too short, not querying"
            );
            return Dispatch::Suppressed;
        }

        self.schedule();
        Dispatch::Scheduled
    }

    /// Reset every filter and fire.
    pub fn clear_all(&self) -> Dispatch {
        self.cancel_pending();
        let filters = self.filters.update(ListFilters::clear);
        self.dispatch_now(filters);
        Dispatch::Fired
    }

    /// Change page and fire, keeping filters.
    pub fn set_page(&self, page: u32) -> Dispatch {
        self.cancel_pending();
        let filters = self.filters.update(|filters| filters.page = page.max(1));
        self.dispatch_now(filters);
        Dispatch::Fired
    }

    /// Fire now with the current filters, dropping any pending fire.
    pub fn refetch(&self) -> Dispatch {
        self.cancel_pending();
        self.dispatch_now(self.filters.get());
        Dispatch::Fired
    }

    /// Current filters.
    #[must_use]
    pub fn filters(&self) -> ListFilters {
        self.filters.get()
    }

    /// The shared filter cell.
    #[must_use]
    pub const fn cell(&self) -> &LatestCell<ListFilters> {
        &self.filters
    }

    /// Whether a debounced fire is waiting.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &DebounceConfig {
        &self.config
    }

    fn dispatch_now(&self, filters: ListFilters) {
        tracing::debug!(page = filters.page, "Refetching");
        (self.fire)(filters);
    }

    fn schedule(&self) {
        let cell = self.filters.clone();
        let fire = Arc::clone(&self.fire);
        let delay = self.config.quiet_interval;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let filters = cell.get();
            tracing::debug!(search = %filters.search, "Quiet interval elapsed, refetching");
            fire(filters);
        });

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }

    fn cancel_pending(&self) {
        if let Some(handle) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

impl Drop for RefetchController {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
