//! # Boxoffice Core
//!
//! Core types and traits for the boxoffice data-access layer.
//!
//! This crate holds the vocabulary every other boxoffice crate speaks:
//!
//! - **Request Descriptor**: what to send (target, method, query, body, cancellation)
//! - **Response Envelope**: what came back, normalized regardless of wire format
//! - **Session Record**: the resolved identity of the current client
//! - **Section Cell**: one independent `{loading, data, error}` unit of a fan-out
//! - **Environment**: injected dependencies (`Transport`, `SessionStorage`)
//!
//! ## Architecture Principles
//!
//! - Ordinary HTTP failures are data (an envelope), not errors
//! - Transport failures are typed errors
//! - All I/O sits behind traits so every layer can be tested without a network
//!
//! ## Example
//!
//! ```
//! use boxoffice_core::request::{Method, RequestDescriptor};
//!
//! let descriptor = RequestDescriptor::get("events")
//!     .with_query("category", "music")
//!     .with_query("page", "2");
//!
//! assert_eq!(descriptor.method(), Method::Get);
//! assert_eq!(descriptor.target(), "events");
//! ```

pub mod cancel;
pub mod environment;
pub mod error;
pub mod id;
pub mod request;
pub mod response;
pub mod section;
pub mod session;

// Re-export commonly used types
pub use cancel::CancelToken;
pub use environment::{SessionStorage, Transport};
pub use error::TransportError;
pub use id::ResourceId;
pub use request::{FormField, Method, RequestBody, RequestDescriptor};
pub use response::{ApiError, Payload, ResponseEnvelope};
pub use section::SectionCell;
pub use session::{Identity, Role, SessionRecord};
