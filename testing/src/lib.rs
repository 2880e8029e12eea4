//! # Boxoffice Testing
//!
//! Testing utilities for the boxoffice data-access layer.
//!
//! This crate provides:
//! - [`MockTransport`]: scripted routes, call counting, latency and cancellation
//! - [`MemoryStorage`]: in-memory session storage mirror
//! - [`fixtures`]: backend payloads shaped like the real API
//! - [`init_test_tracing`]: log output inside tests
//!
//! ## Example
//!
//! ```
//! use boxoffice_core::{Method, RequestDescriptor, Transport};
//! use boxoffice_testing::{MockReply, MockTransport};
//! use serde_json::json;
//!
//! # async fn example() {
//! let transport = MockTransport::new();
//! transport.on(Method::Get, "events", |_| MockReply::json(200, json!([])));
//!
//! let envelope = transport.send(&RequestDescriptor::get("events")).await;
//! assert!(envelope.is_ok_and(|e| e.success));
//! assert_eq!(transport.calls(Method::Get, "events"), 1);
//! # }
//! ```

pub mod fixtures;
pub mod mocks;

pub use mocks::storage::MemoryStorage;
pub use mocks::transport::{MockReply, MockTransport, RecordedRequest};

/// Install a test-friendly tracing subscriber.
///
/// Honors `RUST_LOG`. Safe to call from every test; only the first call
/// installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
