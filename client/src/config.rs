//! Client configuration.
//!
//! Configuration values are provided by the application. [`ClientConfig::from_env`]
//! reads them from environment variables with sensible defaults.

use std::env;
use std::time::Duration;

/// Environment variable holding the backend base URL.
pub const ENV_API_URL: &str = "BOXOFFICE_API_URL";

/// Environment variable holding an optional client-side timeout in milliseconds.
pub const ENV_REQUEST_TIMEOUT_MS: &str = "BOXOFFICE_REQUEST_TIMEOUT_MS";

/// Environment variable holding the storage mirror key prefix.
pub const ENV_STORAGE_PREFIX: &str = "BOXOFFICE_STORAGE_PREFIX";

/// Configuration of the data-access layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL, normalized to end with exactly one `/`.
    base_url: String,

    /// Identity endpoint.
    ///
    /// Default: `auth/me`
    pub identity_path: String,

    /// Session refresh endpoint.
    ///
    /// Default: `auth/refresh`
    pub refresh_path: String,

    /// Logout endpoint.
    ///
    /// Default: `auth/logout`
    pub logout_path: String,

    /// Endpoint issuing short-lived real-time channel tokens.
    ///
    /// Default: `realtime/token`
    pub realtime_token_path: String,

    /// Prefix of every storage mirror key.
    ///
    /// Default: `boxoffice.`
    pub storage_prefix: String,

    /// Client-side request timeout.
    ///
    /// Default: none (a hung request never resolves)
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Create a configuration for the given backend base URL.
    #[must_use]
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.as_ref()),
            identity_path: "auth/me".to_string(),
            refresh_path: "auth/refresh".to_string(),
            logout_path: "auth/logout".to_string(),
            realtime_token_path: "realtime/token".to_string(),
            storage_prefix: "boxoffice.".to_string(),
            request_timeout: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `BOXOFFICE_API_URL` | `http://localhost:8080/api/` |
    /// | `BOXOFFICE_REQUEST_TIMEOUT_MS` | unset |
    /// | `BOXOFFICE_STORAGE_PREFIX` | `boxoffice.` |
    #[must_use]
    pub fn from_env() -> Self {
        let base_url =
            env::var(ENV_API_URL).unwrap_or_else(|_| "http://localhost:8080/api/".to_string());

        let mut config = Self::new(base_url);

        if let Some(ms) = env::var(ENV_REQUEST_TIMEOUT_MS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
        {
            config.request_timeout = Some(Duration::from_millis(ms));
        }

        if let Ok(prefix) = env::var(ENV_STORAGE_PREFIX) {
            config.storage_prefix = prefix;
        }

        config
    }

    /// Set the identity endpoint.
    #[must_use]
    pub fn with_identity_path(mut self, path: impl Into<String>) -> Self {
        self.identity_path = path.into();
        self
    }

    /// Set the refresh endpoint.
    #[must_use]
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// Set the logout endpoint.
    #[must_use]
    pub fn with_logout_path(mut self, path: impl Into<String>) -> Self {
        self.logout_path = path.into();
        self
    }

    /// Set the real-time token endpoint.
    #[must_use]
    pub fn with_realtime_token_path(mut self, path: impl Into<String>) -> Self {
        self.realtime_token_path = path.into();
        self
    }

    /// Set the storage mirror key prefix.
    #[must_use]
    pub fn with_storage_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.storage_prefix = prefix.into();
        self
    }

    /// Set a client-side request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Normalized base URL (always ends with `/`).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a resource path against the base URL.
    ///
    /// Absolute `http://` and `https://` targets are returned unchanged.
    ///
    /// ```
    /// use boxoffice_client::ClientConfig;
    ///
    /// let config = ClientConfig::new("https://tickets.example.com/api");
    /// assert_eq!(config.resolve("events"), "https://tickets.example.com/api/events");
    /// assert_eq!(config.resolve("/api/events"), "https://tickets.example.com/api/events");
    /// ```
    #[must_use]
    pub fn resolve(&self, target: &str) -> String {
        join_url(&self.base_url, target)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080/api/")
    }
}

/// Normalize a base URL: collapse duplicate `api/` segments and end with one `/`.
#[must_use]
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    let mut base = collapse_api_segments(trimmed);
    base.push('/');
    base
}

/// Join a normalized base URL and a resource path.
#[must_use]
pub fn join_url(base: &str, target: &str) -> String {
    if target.starts_with("http://") || target.starts_with("https://") {
        return target.to_string();
    }

    let mut path = target.trim_start_matches('/');
    if base.ends_with("/api/") {
        while let Some(rest) = path.strip_prefix("api/") {
            path = rest;
        }
        if path == "api" {
            path = "";
        }
    }

    collapse_api_segments(&format!("{base}{path}"))
}

fn collapse_api_segments(url: &str) -> String {
    let mut collapsed = url.to_string();
    while collapsed.contains("/api/api/") {
        collapsed = collapsed.replace("/api/api/", "/api/");
    }
    if let Some(stripped) = collapsed.strip_suffix("/api/api") {
        collapsed = format!("{stripped}/api");
    }
    collapsed
}
