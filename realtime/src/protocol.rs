//! Wire protocol.
//!
//! Frames are JSON text tagged by `type`.
//!
//! **Client → Server (Join):**
//! ```json
//! { "type": "join", "id": "6f1c…", "room": "evt-1" }
//! ```
//!
//! **Server → Client (Ack):**
//! ```json
//! { "type": "ack", "id": "6f1c…", "ok": true, "data": null }
//! ```
//!
//! **Server → Client (Update):**
//! ```json
//! { "type": "update", "room": "evt-1", "event": "tickets.available", "payload": { "tierId": "ga", "available": 41 } }
//! ```

use boxoffice_core::ResourceId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Event name used for room joins.
pub const JOIN_EVENT: &str = "join";

/// Frame sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Join a room; acknowledged
    Join {
        /// Correlation id
        id: Uuid,
        /// Room key
        room: ResourceId,
    },
    /// Leave a room; not acknowledged
    Leave {
        /// Room key
        room: ResourceId,
    },
    /// Generic acknowledged request
    Request {
        /// Correlation id
        id: Uuid,
        /// Event name
        event: String,
        /// Request payload
        #[serde(default)]
        payload: Value,
    },
}

/// Frame sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Acknowledgement of a request or join
    Ack {
        /// Correlation id of the acknowledged frame
        id: Uuid,
        /// Whether the request succeeded
        #[serde(default = "default_ok")]
        ok: bool,
        /// Response data
        #[serde(default)]
        data: Value,
        /// Failure message
        #[serde(default)]
        error: Option<String>,
    },
    /// Push update for a room
    Update {
        /// Room key
        room: ResourceId,
        /// Event name
        event: String,
        /// Update payload
        #[serde(default)]
        payload: Value,
    },
    /// Connection-level error notice
    Error {
        /// Server message
        message: String,
    },
}

const fn default_ok() -> bool {
    true
}

/// Update delivered to a room subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomUpdate {
    /// Room key
    pub room: ResourceId,
    /// Event name
    pub event: String,
    /// Update payload
    pub payload: Value,
}
