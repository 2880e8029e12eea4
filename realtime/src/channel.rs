//! Live channel client.
//!
//! # Architecture
//!
//! ```text
//! LiveChannel ── frames ──► writer task ──► sink
//!      │
//!      ├─ pending acks:  correlation id ─► oneshot
//!      └─ rooms:         room ─► listener id ─► mpsc
//!                                    ▲
//! incoming ──► reader task ──────────┘ (updates)  + resolves pending acks
//! ```
//!
//! When the incoming stream ends or the sink fails, every pending request
//! fails with [`RealtimeError::Closed`] and every subscription stream ends.

use crate::config::RealtimeConfig;
use crate::error::{RealtimeError, Result};
use crate::protocol::{ClientFrame, RoomUpdate, ServerFrame, JOIN_EVENT};
use boxoffice_core::ResourceId;
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

type AckResult = std::result::Result<Value, String>;
type Listeners = HashMap<u64, mpsc::Sender<RoomUpdate>>;

struct Shared {
    outgoing: mpsc::UnboundedSender<ClientFrame>,
    pending: Mutex<HashMap<Uuid, oneshot::Sender<AckResult>>>,
    rooms: Mutex<HashMap<ResourceId, Listeners>>,
    next_listener: AtomicU64,
    connected: AtomicBool,
}

impl Shared {
    fn send(&self, frame: ClientFrame) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(RealtimeError::Closed);
        }
        self.outgoing.send(frame).map_err(|_| RealtimeError::Closed)
    }

    fn dispatch(&self, frame: ServerFrame) {
        match frame {
            ServerFrame::Ack { id, ok, data, error } => {
                let waiter = self
                    .pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&id);

                match waiter {
                    Some(waiter) => {
                        let result = if ok {
                            Ok(data)
                        } else {
                            Err(error.unwrap_or_else(|| "rejected".to_string()))
                        };
                        let _ = waiter.send(result);
                    }
                    None => tracing::debug!(%id, "Acknowledgement for unknown or expired request"),
                }
            }
            ServerFrame::Update {
                room,
                event,
                payload,
            } => {
                let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
                let Some(listeners) = rooms.get_mut(&room) else {
                    tracing::trace!(room = %room, "Update for a room with no listeners");
                    return;
                };

                let update = RoomUpdate {
                    room: room.clone(),
                    event,
                    payload,
                };
                listeners.retain(|listener, sender| match sender.try_send(update.clone()) {
                    Ok(()) => true,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(
                            room = %room,
                            listener,
                            "Subscriber lagging, update dropped"
                        );
                        true
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => false,
                });
            }
            ServerFrame::Error { message } => {
                tracing::warn!(message = %message, "Real-time server error");
            }
        }
    }

    fn register(&self, room: &ResourceId, buffer: usize) -> (u64, mpsc::Receiver<RoomUpdate>) {
        let (sender, receiver) = mpsc::channel(buffer);
        let listener = self.next_listener.fetch_add(1, Ordering::SeqCst);
        self.rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(room.clone())
            .or_default()
            .insert(listener, sender);
        (listener, receiver)
    }

    /// Remove a listener. Returns whether it was the room's last one.
    fn deregister(&self, room: &ResourceId, listener: u64) -> bool {
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(listeners) = rooms.get_mut(room) else {
            return false;
        };
        listeners.remove(&listener);
        if listeners.is_empty() {
            rooms.remove(room);
            return true;
        }
        false
    }

    /// Deregister a listener and send a leave frame if it was the room's last.
    fn leave(&self, room: &ResourceId, listener: u64) {
        if self.deregister(room, listener) {
            let frame = ClientFrame::Leave { room: room.clone() };
            if self.send(frame).is_ok() {
                tracing::debug!(room = %room, "Left room");
            }
        }
    }

    fn forget(&self, id: Uuid) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    fn shutdown(&self) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        // Dropping the senders fails pending requests and ends subscriptions.
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        tracing::info!("Real-time channel closed");
    }
}

/// Client of a room-based real-time channel.
///
/// Dropping the channel closes it.
pub struct LiveChannel {
    shared: Arc<Shared>,
    config: RealtimeConfig,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl LiveChannel {
    /// Start the channel over an established connection.
    ///
    /// `sink` receives outgoing JSON text frames; `incoming` yields the
    /// server's. Must be called inside a Tokio runtime.
    pub fn connect<S, I>(sink: S, incoming: I, config: RealtimeConfig) -> Self
    where
        S: Sink<String> + Send + Unpin + 'static,
        S::Error: Display,
        I: Stream<Item = String> + Send + Unpin + 'static,
    {
        let (outgoing, frames) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            outgoing,
            pending: Mutex::new(HashMap::new()),
            rooms: Mutex::new(HashMap::new()),
            next_listener: AtomicU64::new(0),
            connected: AtomicBool::new(true),
        });

        let writer = tokio::spawn(write_frames(sink, frames, Arc::clone(&shared)));
        let reader = tokio::spawn(read_frames(incoming, Arc::clone(&shared)));

        tracing::info!("Real-time channel connected");

        Self {
            shared,
            config,
            writer,
            reader,
        }
    }

    /// Send an acknowledged request and wait for its acknowledgement.
    ///
    /// # Errors
    ///
    /// - [`RealtimeError::AckTimeout`]: no acknowledgement within `ack_timeout`
    /// - [`RealtimeError::Rejected`]: the server acknowledged with a failure
    /// - [`RealtimeError::Closed`]: the connection is gone
    pub async fn request(&self, event: impl Into<String>, payload: Value) -> Result<Value> {
        let event = event.into();
        let id = Uuid::new_v4();
        let frame = ClientFrame::Request {
            id,
            event: event.clone(),
            payload,
        };
        self.acknowledged(id, &event, frame).await
    }

    /// Join the room of `room` and receive its updates.
    ///
    /// The listener is registered before the join is sent, so no update that
    /// follows the acknowledgement is missed.
    ///
    /// # Errors
    ///
    /// Same as [`request`](Self::request). A failed join registers nothing.
    /// A join that is dropped or times out before its acknowledgement also
    /// sends a leave frame, in case the server joined anyway.
    pub async fn join(&self, room: &ResourceId) -> Result<RoomSubscription> {
        let (listener, receiver) = self.shared.register(room, self.config.room_buffer);
        let attempt = JoinAttempt {
            shared: &self.shared,
            room,
            listener,
            armed: true,
        };
        let id = Uuid::new_v4();
        let frame = ClientFrame::Join {
            id,
            room: room.clone(),
        };

        match self.acknowledged(id, JOIN_EVENT, frame).await {
            Ok(_) => attempt.disarm(),
            Err(err @ RealtimeError::Rejected { .. }) => {
                // The server refused, so there is nothing to leave.
                attempt.disarm();
                self.shared.deregister(room, listener);
                return Err(err);
            }
            Err(err) => return Err(err),
        }

        tracing::debug!(room = %room, listener, "Joined room");
        Ok(RoomSubscription {
            room: room.clone(),
            listener,
            receiver,
            shared: Arc::clone(&self.shared),
        })
    }

    /// Whether the connection is still up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Number of requests awaiting an acknowledgement.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Close the channel.
    pub fn close(&self) {
        self.shared.shutdown();
        self.writer.abort();
        self.reader.abort();
    }

    async fn acknowledged(&self, id: Uuid, event: &str, frame: ClientFrame) -> Result<Value> {
        let (sender, receiver) = oneshot::channel();
        self.shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, sender);
        let _pending = PendingAck {
            shared: &self.shared,
            id,
        };

        self.shared.send(frame)?;

        match tokio::time::timeout(self.config.ack_timeout, receiver).await {
            Ok(Ok(Ok(data))) => Ok(data),
            Ok(Ok(Err(message))) => Err(RealtimeError::Rejected {
                event: event.to_string(),
                message,
            }),
            Ok(Err(_)) => Err(RealtimeError::Closed),
            Err(_) => {
                metrics::counter!("realtime.acks.timed_out").increment(1);
                tracing::warn!(%id, event, "Acknowledgement timed out");
                Err(RealtimeError::AckTimeout {
                    event: event.to_string(),
                    id,
                })
            }
        }
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Updates of one joined room.
///
/// Dropping the subscription deregisters it; the last subscription of a room
/// also sends a leave frame.
pub struct RoomSubscription {
    room: ResourceId,
    listener: u64,
    receiver: mpsc::Receiver<RoomUpdate>,
    shared: Arc<Shared>,
}

impl RoomSubscription {
    /// The joined room.
    #[must_use]
    pub const fn room(&self) -> &ResourceId {
        &self.room
    }

    /// Next update, or `None` once the channel is closed.
    pub async fn next(&mut self) -> Option<RoomUpdate> {
        self.receiver.recv().await
    }

    /// Leave the room.
    pub fn leave(self) {
        drop(self);
    }

    /// Turn the subscription into a stream of updates.
    pub fn into_stream(mut self) -> impl Stream<Item = RoomUpdate> + Send {
        async_stream::stream! {
            while let Some(update) = self.next().await {
                yield update;
            }
        }
    }
}

impl Drop for RoomSubscription {
    fn drop(&mut self) {
        self.shared.leave(&self.room, self.listener);
    }
}

/// Removes a pending acknowledgement when its request finishes or is dropped.
struct PendingAck<'a> {
    shared: &'a Shared,
    id: Uuid,
}

impl Drop for PendingAck<'_> {
    fn drop(&mut self) {
        self.shared.forget(self.id);
    }
}

/// Listener registered for a join still waiting on its acknowledgement.
///
/// Dropped while armed (join cancelled, timed out or closed), it deregisters
/// and leaves the room, since the server may have joined anyway.
struct JoinAttempt<'a> {
    shared: &'a Shared,
    room: &'a ResourceId,
    listener: u64,
    armed: bool,
}

impl JoinAttempt<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for JoinAttempt<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!(room = %self.room, "Join abandoned");
            self.shared.leave(self.room, self.listener);
        }
    }
}

async fn write_frames<S>(
    mut sink: S,
    mut frames: mpsc::UnboundedReceiver<ClientFrame>,
    shared: Arc<Shared>,
)
where
    S: Sink<String> + Unpin,
    S::Error: Display,
{
    while let Some(frame) = frames.recv().await {
        let text = match serde_json::to_string(&frame) {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(error = %err, "Failed to encode frame");
                continue;
            }
        };

        if let Err(err) = sink.send(text).await {
            tracing::warn!(error = %err, "Real-time sink failed");
            break;
        }
    }

    shared.shutdown();
}

async fn read_frames<I>(mut incoming: I, shared: Arc<Shared>)
where
    I: Stream<Item = String> + Unpin,
{
    while let Some(text) = incoming.next().await {
        match serde_json::from_str::<ServerFrame>(&text) {
            Ok(frame) => shared.dispatch(frame),
            Err(err) => tracing::warn!(error = %err, "Failed to parse server frame"),
        }
    }

    tracing::debug!("Incoming stream ended");
    shared.shutdown();
}
