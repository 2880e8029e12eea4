//! Authentication endpoints beyond the session itself.

use crate::error::Result;
use crate::orchestrator::AuthenticatedClient;
use boxoffice_core::{RequestDescriptor, Transport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Short-lived token for the real-time channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeToken {
    /// Opaque token
    pub token: String,
    /// Expiry instant
    pub expires_at: DateTime<Utc>,
}

impl RealtimeToken {
    /// Whether the token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Fetch a real-time channel token through `GET {path}`.
///
/// # Errors
///
/// Any [`ClientError`](crate::error::ClientError) of the request, or
/// `Decode` if the payload is not a token.
pub async fn realtime_token<T>(client: &AuthenticatedClient<T>, path: &str) -> Result<RealtimeToken>
where
    T: Transport + 'static,
{
    let token: RealtimeToken = client.request_json(&RequestDescriptor::get(path)).await?;
    tracing::debug!(expires_at = %token.expires_at, "Realtime token issued");
    Ok(token)
}
