//! Resource identification.
//!
//! A [`ResourceId`] names the parent record of a fan-out (an event, a venue)
//! or the key of a real-time room.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for `ResourceId` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid resource ID: {0}")]
pub struct ParseResourceIdError(String);

/// Identifier of a backend resource.
///
/// # Validation
///
/// - `FromStr::from_str()`: rejects empty strings and strings containing `/`
///   (an id is always a single path segment)
/// - `From::from()` and `new()`: no validation, for ids that came from the backend
///
/// # Examples
///
/// ```
/// use boxoffice_core::ResourceId;
///
/// let id = ResourceId::new("evt-42");
/// assert_eq!(id.as_str(), "evt-42");
///
/// let parsed: ResourceId = "evt-42".parse().unwrap();
/// assert_eq!(parsed, id);
/// assert!("a/b".parse::<ResourceId>().is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Create a new `ResourceId` from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert into the inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResourceId {
    type Err = ParseResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseResourceIdError("Resource ID cannot be empty".to_string()));
        }
        if s.contains('/') {
            return Err(ParseResourceIdError(format!(
                "Resource ID cannot contain '/': {s}"
            )));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
