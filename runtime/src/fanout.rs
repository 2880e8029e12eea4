//! Progressive fan-out aggregation.
//!
//! A [`FanOut`] names the sub-resources of a parent record. [`FanOut::load_all`]
//! starts every section at once; each settles into its own [`SectionCell`]
//! without waiting for its siblings. A failed section is recorded as an error
//! cell and never touches another section.
//!
//! # Example
//!
//! ```
//! use boxoffice_core::ResourceId;
//! use boxoffice_runtime::fanout::FanOut;
//!
//! # async fn example() {
//! let fan_out = FanOut::new()
//!     .section("tickets", |id: ResourceId| async move { Ok::<_, String>(format!("tickets of {id}")) })
//!     .section("gallery", |_id: ResourceId| async move { Err::<String, _>("HTTP 403".to_string()) });
//!
//! let sections = fan_out.load_all(&ResourceId::new("evt-1")).wait_all().await;
//!
//! assert!(sections["tickets"].data.is_some());
//! assert!(sections["gallery"].is_failed());
//! # }
//! ```

use boxoffice_core::{ResourceId, SectionCell};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{Id, JoinSet};

/// Section cells keyed by section name.
pub type SectionMap<T> = BTreeMap<String, SectionCell<T>>;

type Loader<T> = Arc<dyn Fn(ResourceId) -> BoxFuture<'static, Result<T, String>> + Send + Sync>;

/// Set of independent sub-resource loaders for one kind of parent record.
pub struct FanOut<T> {
    sections: Vec<(String, Loader<T>)>,
}

impl<T> Clone for FanOut<T> {
    fn clone(&self) -> Self {
        Self {
            sections: self.sections.clone(),
        }
    }
}

impl<T> Default for FanOut<T> {
    fn default() -> Self {
        Self {
            sections: Vec::new(),
        }
    }
}

impl<T> FanOut<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// An aggregator with no sections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section. A section with the same name replaces the earlier one.
    #[must_use]
    pub fn section<F, Fut, E>(mut self, name: impl Into<String>, load: F) -> Self
    where
        F: Fn(ResourceId) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + 'static,
    {
        let name = name.into();
        let loader: Loader<T> =
            Arc::new(move |id| load(id).map(|result| result.map_err(|e| e.to_string())).boxed());

        self.sections.retain(|(existing, _)| *existing != name);
        self.sections.push((name, loader));
        self
    }

    /// Section names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(name, _)| name.as_str())
    }

    /// Start every section for `parent`.
    ///
    /// Must be called inside a Tokio runtime. Every cell starts as loading.
    pub fn load_all(&self, parent: &ResourceId) -> FanOutHandle<T> {
        let initial: SectionMap<T> = self
            .sections
            .iter()
            .map(|(name, _)| (name.clone(), SectionCell::loading()))
            .collect();
        let (sender, receiver) = watch::channel(initial);
        let sender = Arc::new(sender);

        tracing::debug!(parent = %parent, sections = self.sections.len(), "Fan-out started");

        let mut tasks = JoinSet::new();
        let mut names = HashMap::new();
        for (name, loader) in &self.sections {
            let name = name.clone();
            let loader = Arc::clone(loader);
            let sender = Arc::clone(&sender);
            let parent = parent.clone();

            let task_name = name.clone();
            let task = tasks.spawn(async move {
                let result = loader(parent.clone()).await;

                if let Err(err) = &result {
                    metrics::counter!("fanout.section.failed", "section" => name.clone())
                        .increment(1);
                    tracing::warn!(
                        parent = %parent,
                        section = %name,
                        error = %err,
                        "Section failed"
                    );
                } else {
                    tracing::debug!(parent = %parent, section = %name, "Section loaded");
                }

                sender.send_modify(|sections| {
                    sections.insert(name, SectionCell::from(result));
                });
            });
            names.insert(task.id(), task_name);
        }

        FanOutHandle {
            receiver,
            sender,
            tasks,
            names,
        }
    }
}

/// Live view of one fan-out.
///
/// Dropping the handle aborts sections still in flight.
pub struct FanOutHandle<T> {
    receiver: watch::Receiver<SectionMap<T>>,
    sender: Arc<watch::Sender<SectionMap<T>>>,
    tasks: JoinSet<()>,
    names: HashMap<Id, String>,
}

impl<T: Clone> FanOutHandle<T> {
    /// Current cells.
    #[must_use]
    pub fn snapshot(&self) -> SectionMap<T> {
        self.receiver.borrow().clone()
    }

    /// Current cell of one section.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<SectionCell<T>> {
        self.receiver.borrow().get(name).cloned()
    }

    /// Whether every section has settled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.receiver.borrow().values().all(SectionCell::is_settled)
    }

    /// Observe cell changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SectionMap<T>> {
        self.receiver.clone()
    }

    /// Wait for every section to settle and return the final cells.
    ///
    /// A section whose task panicked or was aborted settles as failed.
    pub async fn wait_all(mut self) -> SectionMap<T> {
        while let Some(joined) = self.tasks.join_next_with_id().await {
            let Err(err) = joined else {
                continue;
            };
            let Some(name) = self.names.get(&err.id()).cloned() else {
                continue;
            };

            let message = if err.is_cancelled() {
                "Section aborted"
            } else {
                "Section task panicked"
            };
            metrics::counter!("fanout.section.failed", "section" => name.clone()).increment(1);
            tracing::error!(section = %name, error = %err, "{message}");

            self.sender.send_modify(|sections| {
                if sections.get(&name).is_some_and(|cell| !cell.is_settled()) {
                    sections.insert(name, SectionCell::failed(message));
                }
            });
        }
        self.snapshot()
    }

    /// Abort every section still in flight.
    ///
    /// Aborted sections settle as failed once [`wait_all`](Self::wait_all)
    /// collects them.
    pub fn abort(&mut self) {
        self.tasks.abort_all();
    }
}
