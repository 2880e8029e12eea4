//! Event endpoints.

use crate::error::Result;
use crate::orchestrator::AuthenticatedClient;
use boxoffice_core::{CancelToken, RequestDescriptor, ResourceId, Transport};
use boxoffice_runtime::cell::LatestCell;
use boxoffice_runtime::debounce::{DebounceConfig, Dispatch, RefetchController};
use boxoffice_runtime::fanout::{FanOut, FanOutHandle};
use boxoffice_runtime::filters::{FilterKey, ListFilters};
use boxoffice_runtime::guard::{QueryGuard, QueryState};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Section names of the event detail fan-out.
pub const DETAIL_SECTIONS: [&str; 3] = ["tickets", "venues", "gallery"];

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items of this page
    pub items: Vec<T>,
    /// 1-based page number
    #[serde(default = "first_page")]
    pub page: u32,
    /// Total number of items across pages
    #[serde(default)]
    pub total: u64,
}

const fn first_page() -> u32 {
    1
}

/// Event as shown in lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    /// Event id
    pub id: ResourceId,
    /// Title
    pub title: String,
    /// Category
    #[serde(default)]
    pub category: Option<String>,
    /// Status
    #[serde(default)]
    pub status: Option<String>,
    /// Start time
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    /// Name of the main venue
    #[serde(default)]
    pub venue_name: Option<String>,
}

/// Event detail record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    /// Event id
    pub id: ResourceId,
    /// Title
    pub title: String,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Category
    #[serde(default)]
    pub category: Option<String>,
    /// Status
    #[serde(default)]
    pub status: Option<String>,
    /// Start time
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    /// End time
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    /// Owning organizer
    #[serde(default)]
    pub organizer_id: Option<String>,
}

/// Ticket tier of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketTier {
    /// Tier id
    pub id: String,
    /// Display name
    pub name: String,
    /// Unit price
    pub price: f64,
    /// Tickets left
    #[serde(default)]
    pub available: u32,
}

/// Venue of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    /// Venue id
    pub id: String,
    /// Display name
    pub name: String,
    /// City
    #[serde(default)]
    pub city: Option<String>,
}

/// Gallery image of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryImage {
    /// Image id
    pub id: String,
    /// Image URL, usually on a CDN origin
    pub url: String,
    /// Caption
    #[serde(default)]
    pub caption: Option<String>,
}

/// Data of one event detail section.
#[derive(Debug, Clone, PartialEq)]
pub enum EventSection {
    /// Ticket tiers
    Tickets(Vec<TicketTier>),
    /// Venues
    Venues(Vec<Venue>),
    /// Gallery images
    Gallery(Vec<GalleryImage>),
}

/// Event endpoints.
pub struct EventsApi<T> {
    client: AuthenticatedClient<T>,
    min_search_len: usize,
}

impl<T> Clone for EventsApi<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            min_search_len: self.min_search_len,
        }
    }
}

impl<T> EventsApi<T>
where
    T: Transport + 'static,
{
    /// Create the API over an authenticated client.
    #[must_use]
    pub const fn new(client: AuthenticatedClient<T>) -> Self {
        Self {
            client,
            min_search_len: 2,
        }
    }

    /// Search text shorter than this is not sent.
    #[must_use]
    pub const fn with_min_search_len(mut self, len: usize) -> Self {
        self.min_search_len = len;
        self
    }

    /// `GET events` with the query derived from `filters`.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`](crate::error::ClientError) of the request.
    pub async fn list_events(
        &self,
        filters: &ListFilters,
        cancel: CancelToken,
    ) -> Result<Page<EventSummary>> {
        let descriptor = RequestDescriptor::get("events")
            .with_query_pairs(filters.query_pairs(self.min_search_len))
            .with_cancel(cancel);
        self.client.request_json(&descriptor).await
    }

    /// `GET events/{id}`.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`](crate::error::ClientError) of the request.
    pub async fn event(&self, id: &ResourceId) -> Result<EventDetail> {
        self.get(format!("events/{id}")).await
    }

    /// `GET events/{id}/tickets`.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`](crate::error::ClientError) of the request.
    pub async fn event_tickets(&self, id: &ResourceId) -> Result<Vec<TicketTier>> {
        self.get(format!("events/{id}/tickets")).await
    }

    /// `GET events/{id}/venues`.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`](crate::error::ClientError) of the request.
    pub async fn event_venues(&self, id: &ResourceId) -> Result<Vec<Venue>> {
        self.get(format!("events/{id}/venues")).await
    }

    /// `GET events/{id}/gallery`.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`](crate::error::ClientError) of the request.
    pub async fn event_gallery(&self, id: &ResourceId) -> Result<Vec<GalleryImage>> {
        self.get(format!("events/{id}/gallery")).await
    }

    /// Fan-out over the detail sections of an event.
    #[must_use]
    pub fn detail_sections(&self) -> FanOut<EventSection> {
        let tickets = self.clone();
        let venues = self.clone();
        let gallery = self.clone();

        FanOut::new()
            .section(DETAIL_SECTIONS[0], move |id: ResourceId| {
                let api = tickets.clone();
                async move { api.event_tickets(&id).await.map(EventSection::Tickets) }
            })
            .section(DETAIL_SECTIONS[1], move |id: ResourceId| {
                let api = venues.clone();
                async move { api.event_venues(&id).await.map(EventSection::Venues) }
            })
            .section(DETAIL_SECTIONS[2], move |id: ResourceId| {
                let api = gallery.clone();
                async move { api.event_gallery(&id).await.map(EventSection::Gallery) }
            })
    }

    /// Start loading every detail section of event `id`.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn event_detail_sections(&self, id: &ResourceId) -> FanOutHandle<EventSection> {
        self.detail_sections().load_all(id)
    }

    async fn get<R: DeserializeOwned>(&self, target: String) -> Result<R> {
        self.client.request_json(&RequestDescriptor::get(target)).await
    }
}

/// The events list page: filters, debounce and a stale-safe result.
///
/// Every dispatch of the [`RefetchController`] issues a new generation on the
/// list's [`QueryGuard`] and sends `GET events`. The request reads the filters
/// from the shared cell when it sends. A response of a superseded request
/// never reaches [`state`](Self::state).
///
/// Must be used inside a Tokio runtime. Dropping the list cancels the request
/// in flight and any pending debounced fire.
pub struct EventListQuery {
    guard: QueryGuard<Page<EventSummary>>,
    controller: RefetchController,
}

impl EventListQuery {
    /// Create the list over `api`. Nothing is sent until the first dispatch.
    pub fn new<T>(api: EventsApi<T>, config: DebounceConfig) -> Self
    where
        T: Transport + 'static,
    {
        let guard = QueryGuard::new("events.list");
        let filters = LatestCell::new(ListFilters::default());
        let api = api.with_min_search_len(config.min_search_len);

        let site = guard.clone();
        let cell = filters.clone();
        let controller = RefetchController::with_cell(config, filters, move |_| {
            // Issue before spawning so generations follow dispatch order.
            let ticket = site.issue();
            let site = site.clone();
            let api = api.clone();
            let cell = cell.clone();

            tokio::spawn(async move {
                let cancel = ticket.cancel_token().clone();
                let result = api.list_events(&cell.get(), cancel).await;
                let _ = site.complete(&ticket, result);
            });
        });

        Self { guard, controller }
    }

    /// Change one filter.
    pub fn update_filter(&self, key: FilterKey, value: impl Into<String>) -> Dispatch {
        self.controller.update_filter(key, value)
    }

    /// Change the search text.
    pub fn search(&self, text: impl Into<String>) -> Dispatch {
        self.controller.update_filter(FilterKey::Search, text)
    }

    /// Reset every filter and reload.
    pub fn clear_all(&self) -> Dispatch {
        self.controller.clear_all()
    }

    /// Load another page with the same filters.
    pub fn set_page(&self, page: u32) -> Dispatch {
        self.controller.set_page(page)
    }

    /// Reload with the current filters.
    pub fn refetch(&self) -> Dispatch {
        self.controller.refetch()
    }

    /// Current filters.
    #[must_use]
    pub fn filters(&self) -> ListFilters {
        self.controller.filters()
    }

    /// Snapshot of the list state.
    #[must_use]
    pub fn state(&self) -> QueryState<Page<EventSummary>> {
        self.guard.state()
    }

    /// Observe list state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<QueryState<Page<EventSummary>>> {
        self.guard.subscribe()
    }
}

impl Drop for EventListQuery {
    fn drop(&mut self) {
        self.guard.cancel();
    }
}
