//! # Boxoffice Realtime
//!
//! Client side of the live ticket-counter channel.
//!
//! The connection itself (WebSocket, reconnection, backoff) belongs to the
//! caller. [`LiveChannel`] only needs a sink for outgoing text frames and a
//! stream of incoming ones, and adds on top:
//!
//! - **Rooms**: join a room keyed by a resource id, receive its updates, leave
//!   it when the subscription goes away
//! - **Acknowledged requests**: every request carries a correlation id and
//!   resolves with the matching acknowledgement, or times out
//!
//! ## Example
//!
//! ```no_run
//! use boxoffice_core::ResourceId;
//! use boxoffice_realtime::{LiveChannel, RealtimeConfig};
//!
//! # async fn example(
//! #     sink: futures::channel::mpsc::UnboundedSender<String>,
//! #     incoming: futures::channel::mpsc::UnboundedReceiver<String>,
//! # ) -> Result<(), boxoffice_realtime::RealtimeError> {
//! let channel = LiveChannel::connect(sink, incoming, RealtimeConfig::default());
//!
//! let mut counters = channel.join(&ResourceId::new("evt-1")).await?;
//! while let Some(update) = counters.next().await {
//!     println!("{}: {}", update.event, update.payload);
//! }
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod protocol;

pub use channel::{LiveChannel, RoomSubscription};
pub use config::RealtimeConfig;
pub use error::{RealtimeError, Result};
pub use protocol::{ClientFrame, RoomUpdate, ServerFrame};
