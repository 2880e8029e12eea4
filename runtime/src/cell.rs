//! Pointer-to-latest parameter cell.
//!
//! Work that was started with one set of parameters and suspends on the network
//! must read parameters through a [`LatestCell`] when it resumes, never through
//! a copy captured when it started.

use std::sync::{Arc, PoisonError, RwLock};

/// Shared cell holding the latest known value.
///
/// All clones see the same value.
#[derive(Debug, Default)]
pub struct LatestCell<T> {
    value: Arc<RwLock<T>>,
}

impl<T> Clone for LatestCell<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

impl<T: Clone> LatestCell<T> {
    /// Create a cell holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            value: Arc::new(RwLock::new(value)),
        }
    }

    /// Copy of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the value.
    pub fn set(&self, value: T) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Mutate the value in place and return a copy of the result.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> T {
        let mut guard = self.value.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
        guard.clone()
    }

    /// Read through the cell without copying.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_value() {
        let cell = LatestCell::new(1);
        let reader = cell.clone();

        cell.set(2);
        assert_eq!(reader.get(), 2);

        let updated = reader.update(|v| *v += 40);
        assert_eq!(updated, 42);
        assert_eq!(cell.with(|v| *v * 2), 84);
    }

    #[tokio::test]
    async fn test_suspended_work_reads_latest() {
        let cell = LatestCell::new("music".to_string());
        let (resume_tx, resume_rx) = tokio::sync::oneshot::channel::<()>();

        let reader = cell.clone();
        let task = tokio::spawn(async move {
            let _ = resume_rx.await;
            reader.get()
        });

        cell.set("theatre".to_string());
        let _ = resume_tx.send(());

        assert_eq!(task.await.ok().as_deref(), Some("theatre"));
    }
}
