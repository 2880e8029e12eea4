//! Backend payloads shaped like the real API.

use serde_json::{json, Value};

/// Identity endpoint payload for a signed-in user.
#[must_use]
pub fn identity_payload(id: &str, role: &str) -> Value {
    json!({
        "user": {
            "id": id,
            "email": format!("{id}@example.com"),
            "name": "Test User",
            "role": role,
        },
        "profile": {
            "city": "Lisbon",
        },
    })
}

/// One event as it appears in a list.
#[must_use]
pub fn event_summary(id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "category": "music",
        "status": "published",
        "startsAt": "2026-11-20T20:00:00Z",
        "venueName": "Main hall",
    })
}

/// A page of event summaries.
#[must_use]
pub fn event_page(items: Vec<Value>, page: u32, total: u64) -> Value {
    json!({
        "items": items,
        "page": page,
        "total": total,
    })
}

/// Ticket tiers of an event.
#[must_use]
pub fn ticket_tiers(event_id: &str) -> Value {
    json!([
        { "id": format!("{event_id}-ga"), "name": "General admission", "price": 25.0, "available": 120 },
        { "id": format!("{event_id}-vip"), "name": "VIP", "price": 80.0, "available": 10 },
    ])
}

/// Venues of an event.
#[must_use]
pub fn venues(event_id: &str) -> Value {
    json!([
        { "id": format!("{event_id}-hall"), "name": "Main hall", "city": "Lisbon" },
    ])
}

/// Gallery images of an event.
#[must_use]
pub fn gallery(event_id: &str) -> Value {
    json!([
        { "id": format!("{event_id}-img-1"), "url": "https://cdn.example.com/poster.png", "caption": null },
    ])
}
