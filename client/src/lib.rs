//! # Boxoffice Client
//!
//! Credentialed HTTP access to the ticketing backend.
//!
//! ## Layers
//!
//! - **Transport** ([`transport::HttpTransport`]): one request, normalized
//!   encoding and error decoding, ambient cookie credential
//! - **Refresh Coordinator** ([`refresh::RefreshCoordinator`]): at most one
//!   re-authentication exchange in flight
//! - **Orchestrator** ([`orchestrator::AuthenticatedClient`]): refresh once on
//!   401, retry once
//! - **Session Cache** ([`session::SessionCache`]): one memoized identity
//!   resolution shared by every caller
//! - **Context** ([`context::ClientContext`]): the wired stack with an explicit
//!   lifecycle
//!
//! ## Example
//!
//! ```no_run
//! use boxoffice_client::{ClientConfig, ClientContext};
//! use boxoffice_core::{CancelToken, SessionStorage};
//! use boxoffice_runtime::ListFilters;
//! use std::sync::Arc;
//!
//! # struct NoStorage;
//! # impl SessionStorage for NoStorage {
//! #     fn get(&self, _: &str) -> Option<String> { None }
//! #     fn set(&self, _: &str, _: &str) {}
//! #     fn remove(&self, _: &str) {}
//! # }
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let context = ClientContext::connect(ClientConfig::from_env(), Arc::new(NoStorage))?;
//!
//! let session = context.session(false).await?;
//! if session.is_authenticated {
//!     let page = context
//!         .events()
//!         .list_events(&ListFilters::default(), CancelToken::new())
//!         .await?;
//!     println!("{} events", page.total);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod refresh;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use config::ClientConfig;
pub use context::ClientContext;
pub use error::{ClientError, Result};
pub use orchestrator::AuthenticatedClient;
pub use refresh::{RefreshCoordinator, RefreshState};
pub use session::{SessionCache, SessionHint, SessionState};
pub use transport::HttpTransport;
