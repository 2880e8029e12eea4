//! List filter state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Filters a list view can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    /// Free-text search (debounced)
    Search,
    /// Event category
    Category,
    /// Publication or sale status
    Status,
    /// Sort order
    Sort,
    /// Organizer scope
    Organizer,
}

impl FilterKey {
    /// Query parameter name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Category => "category",
            Self::Status => "status",
            Self::Sort => "sort",
            Self::Organizer => "organizer",
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter and paging state of a list query site.
///
/// Empty values mean "not filtered".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilters {
    /// Free-text search
    pub search: String,
    /// Event category
    pub category: Option<String>,
    /// Status
    pub status: Option<String>,
    /// Sort order
    pub sort: Option<String>,
    /// Organizer scope
    pub organizer: Option<String>,
    /// 1-based page number
    pub page: u32,
    /// Items per page
    pub page_size: u32,
}

impl Default for ListFilters {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: None,
            status: None,
            sort: None,
            organizer: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListFilters {
    /// Set one filter. An empty `value` clears it.
    pub fn set(&mut self, key: FilterKey, value: impl Into<String>) {
        let value = value.into();
        let optional = || (!value.is_empty()).then(|| value.clone());

        match key {
            FilterKey::Search => self.search = value.clone(),
            FilterKey::Category => self.category = optional(),
            FilterKey::Status => self.status = optional(),
            FilterKey::Sort => self.sort = optional(),
            FilterKey::Organizer => self.organizer = optional(),
        }
    }

    /// Current value of one filter.
    #[must_use]
    pub fn get(&self, key: FilterKey) -> Option<&str> {
        match key {
            FilterKey::Search => (!self.search.is_empty()).then_some(self.search.as_str()),
            FilterKey::Category => self.category.as_deref(),
            FilterKey::Status => self.status.as_deref(),
            FilterKey::Sort => self.sort.as_deref(),
            FilterKey::Organizer => self.organizer.as_deref(),
        }
    }

    /// Back to defaults, keeping the page size.
    pub fn clear(&mut self) {
        *self = Self {
            page_size: self.page_size,
            ..Self::default()
        };
    }

    /// Whether the search text is long enough to be sent.
    ///
    /// Empty text is "no search" and always counts as ready.
    #[must_use]
    pub fn search_ready(&self, min_search_len: usize) -> bool {
        let len = self.search.trim().chars().count();
        len == 0 || len >= min_search_len
    }

    /// Query parameters for the list endpoint.
    ///
    /// Search text shorter than `min_search_len` is left out.
    #[must_use]
    pub fn query_pairs(&self, min_search_len: usize) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        let search = self.search.trim();
        if !search.is_empty() && search.chars().count() >= min_search_len {
            pairs.push((FilterKey::Search.to_string(), search.to_string()));
        }

        for key in [
            FilterKey::Category,
            FilterKey::Status,
            FilterKey::Sort,
            FilterKey::Organizer,
        ] {
            if let Some(value) = self.get(key) {
                pairs.push((key.to_string(), value.to_string()));
            }
        }

        pairs.push(("page".to_string(), self.page.to_string()));
        pairs.push(("limit".to_string(), self.page_size.to_string()));
        pairs
    }
}
