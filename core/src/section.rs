//! Section cells for progressive fan-out.

use serde::{Deserialize, Serialize};

/// Independent `{loading, data, error}` unit for one sub-resource.
///
/// A cell moves from loading to exactly one of "has data" or "has error". Cells
/// never look at each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionCell<T> {
    /// The sub-resource request has not settled yet
    pub loading: bool,
    /// Resolved data
    pub data: Option<T>,
    /// Failure message
    pub error: Option<String>,
}

impl<T> SectionCell<T> {
    /// A cell whose request is in flight.
    #[must_use]
    pub const fn loading() -> Self {
        Self {
            loading: true,
            data: None,
            error: None,
        }
    }

    /// A cell resolved with data.
    #[must_use]
    pub const fn ready(data: T) -> Self {
        Self {
            loading: false,
            data: Some(data),
            error: None,
        }
    }

    /// A cell that failed.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            loading: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Whether the cell has settled (data or error).
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !self.loading
    }

    /// Whether the cell settled with an error.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for SectionCell<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::ready(data),
            Err(err) => Self::failed(err.to_string()),
        }
    }
}

impl<T> Default for SectionCell<T> {
    fn default() -> Self {
        Self::loading()
    }
}
