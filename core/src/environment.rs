//! Injected dependencies.
//!
//! All I/O of the data-access layer goes through these traits, so every layer
//! above can be exercised against scripted implementations.

use crate::error::TransportError;
use crate::request::RequestDescriptor;
use crate::response::ResponseEnvelope;

/// Issues a single network request.
///
/// # Contract
///
/// - Ordinary HTTP failures resolve to `Ok` with `success == false`
/// - Only transport-level failures resolve to `Err`
/// - The ambient credential is attached to requests for the backend origin and
///   to no other origin
pub trait Transport: Send + Sync {
    /// Send one request.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if no response could be obtained:
    /// - Network unreachable
    /// - Malformed request
    /// - Cancelled through the descriptor's token
    fn send(
        &self,
        descriptor: &RequestDescriptor,
    ) -> impl std::future::Future<Output = Result<ResponseEnvelope, TransportError>> + Send;
}

/// Client-side key-value store mirroring parts of the session.
///
/// The mirror only lets a UI render before the identity query resolves. It is
/// never an authority for access control.
pub trait SessionStorage: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value.
    fn set(&self, key: &str, value: &str);

    /// Delete a value.
    fn remove(&self, key: &str);
}
