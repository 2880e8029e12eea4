//! Session records.
//!
//! A [`SessionRecord`] is the resolved answer to "who is the current user".
//! It is built from the identity endpoint payload, which may arrive in either
//! of two shapes:
//!
//! ```json
//! { "user": { "id": "u-1", "email": "a@b.c", "role": "organizer" }, "profile": { ... } }
//! { "id": "u-1", "email": "a@b.c", "role": "organizer", "avatar": "..." }
//! ```
//!
//! In the flat shape, every field other than `id`, `email`, `name` and `role`
//! becomes a profile field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Role of the current user, normalized to a fixed upper-case vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Not signed in
    #[default]
    Guest,
    /// Ticket buyer
    User,
    /// Publishes and manages events
    Organizer,
    /// Platform administrator
    Admin,
}

impl Role {
    /// Normalize a backend role string.
    ///
    /// Matching ignores case and surrounding whitespace. Unrecognized roles of an
    /// authenticated user fall back to [`Role::User`].
    ///
    /// ```
    /// use boxoffice_core::Role;
    ///
    /// assert_eq!(Role::normalize("organizer"), Role::Organizer);
    /// assert_eq!(Role::normalize(" Admin "), Role::Admin);
    /// assert_eq!(Role::normalize("moderator"), Role::User);
    /// ```
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ADMIN" | "ADMINISTRATOR" => Self::Admin,
            "ORGANIZER" | "ORGANISER" => Self::Organizer,
            "GUEST" => Self::Guest,
            _ => Self::User,
        }
    }

    /// Upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "GUEST",
            Self::User => "USER",
            Self::Organizer => "ORGANIZER",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Backend user id
    pub id: String,
    /// Email address
    pub email: String,
    /// Display name
    pub name: Option<String>,
}

/// Error returned when an identity payload cannot be read.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Malformed identity payload: {0}")]
pub struct IdentityPayloadError(String);

/// Resolved identity of the current client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Whether a user is signed in
    pub is_authenticated: bool,
    /// The signed-in user
    pub user: Option<Identity>,
    /// Normalized role
    pub role: Role,
    /// Supplementary profile fields
    pub profile: Map<String, Value>,
}

impl SessionRecord {
    /// Record of a client that is not signed in.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self {
            is_authenticated: false,
            user: None,
            role: Role::Guest,
            profile: Map::new(),
        }
    }

    /// Build a record from an identity endpoint payload.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityPayloadError`] if the payload is not an object or lacks
    /// the user `id`.
    pub fn from_identity_payload(payload: &Value) -> Result<Self, IdentityPayloadError> {
        let root = payload
            .as_object()
            .ok_or_else(|| IdentityPayloadError("expected a JSON object".to_string()))?;

        let (user, mut profile, flat) = match root.get("user") {
            Some(Value::Object(user)) => {
                let profile = root
                    .get("profile")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                (user, profile, false)
            }
            Some(Value::Null) => return Ok(Self::unauthenticated()),
            _ => (root, Map::new(), true),
        };

        let id = match user.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => return Err(IdentityPayloadError("missing user id".to_string())),
        };

        let text = |key: &str| user.get(key).and_then(Value::as_str).map(str::to_string);

        let role = root
            .get("role")
            .and_then(Value::as_str)
            .or_else(|| user.get("role").and_then(Value::as_str))
            .map_or(Role::User, Role::normalize);

        if flat {
            for (key, value) in user {
                if !matches!(key.as_str(), "id" | "email" | "name" | "role") {
                    profile.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(Self {
            is_authenticated: true,
            user: Some(Identity {
                id,
                email: text("email").unwrap_or_default(),
                name: text("name"),
            }),
            role: if role == Role::Guest { Role::User } else { role },
            profile,
        })
    }
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self::unauthenticated()
    }
}
