//! Typed endpoint helpers.
//!
//! Thin wrappers that build descriptors, send them through the
//! [`AuthenticatedClient`](crate::orchestrator::AuthenticatedClient) and decode
//! the payload.

pub mod auth;
pub mod events;

pub use auth::{realtime_token, RealtimeToken};
pub use events::{
    EventDetail, EventListQuery, EventSection, EventSummary, EventsApi, GalleryImage, Page,
    TicketTier, Venue,
};
