//! Integration tests for the HTTP transport against a mock backend.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use boxoffice_client::{ClientConfig, HttpTransport};
use boxoffice_core::{
    CancelToken, FormField, Method, Payload, RequestBody, RequestDescriptor, Transport,
    TransportError,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport_for(server: &MockServer) -> HttpTransport {
    HttpTransport::new(ClientConfig::new(format!("{}/api", server.uri()))).unwrap()
}

// ============================================================================
// Error normalization
// ============================================================================

#[tokio::test]
async fn test_validation_error_message_and_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({ "message": "Invalid pincode" })))
        .mount(&server)
        .await;

    let descriptor = RequestDescriptor::post("orders")
        .with_body(RequestBody::Json(json!({ "pincode": "00" })));
    let envelope = transport_for(&server).send(&descriptor).await.unwrap();

    assert!(!envelope.success);
    let error = envelope.error.unwrap();
    assert_eq!(error.message, "Invalid pincode");
    assert_eq!(error.status, 422);
}

#[tokio::test]
async fn test_generic_error_field_is_used_without_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events/evt-1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "Event not found" })))
        .mount(&server)
        .await;

    let envelope = transport_for(&server)
        .send(&RequestDescriptor::get("events/evt-1"))
        .await
        .unwrap();

    assert_eq!(envelope.error.unwrap().message, "Event not found");
}

#[tokio::test]
async fn test_plain_text_error_falls_back_to_status_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad gateway</html>"))
        .mount(&server)
        .await;

    let envelope = transport_for(&server)
        .send(&RequestDescriptor::get("events"))
        .await
        .unwrap();

    let error = envelope.error.unwrap();
    assert_eq!(error.status, 502);
    assert_eq!(error.message, "HTTP 502: Bad Gateway");
    assert_eq!(error.raw_body.as_deref(), Some("<html>Bad gateway</html>"));
}

// ============================================================================
// Success decoding
// ============================================================================

#[tokio::test]
async fn test_json_and_text_success_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let transport = transport_for(&server);

    let json = transport.send(&RequestDescriptor::get("events")).await.unwrap();
    assert_eq!(json.data, Some(Payload::Json(json!({ "items": [] }))));

    let text = transport.send(&RequestDescriptor::get("health")).await.unwrap();
    assert_eq!(text.data, Some(Payload::Text("ok".to_string())));
}

#[tokio::test]
async fn test_empty_success_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/events/evt-1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let envelope = transport_for(&server)
        .send(&RequestDescriptor::new(Method::Delete, "events/evt-1"))
        .await
        .unwrap();

    assert!(envelope.success);
    assert_eq!(envelope.data, None);
}

// ============================================================================
// Request encoding
// ============================================================================

#[tokio::test]
async fn test_json_body_and_query_are_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .and(query_param("dryRun", "true"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "event": "evt-1", "quantity": 2 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "ord-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let descriptor = RequestDescriptor::post("orders")
        .with_query("dryRun", "true")
        .with_body(RequestBody::Json(json!({ "event": "evt-1", "quantity": 2 })));

    let envelope = transport_for(&server).send(&descriptor).await.unwrap();
    assert_eq!(envelope.status, 201);
}

#[tokio::test]
async fn test_multipart_body_negotiates_its_own_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/events/evt-1/gallery"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let descriptor = RequestDescriptor::post("events/evt-1/gallery").with_body(RequestBody::Multipart(vec![
        FormField::Text {
            name: "caption".to_string(),
            value: "Opening night".to_string(),
        },
        FormField::File {
            name: "image".to_string(),
            filename: "poster.png".to_string(),
            mime: Some("image/png".to_string()),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        },
    ]));

    let envelope = transport_for(&server).send(&descriptor).await.unwrap();
    assert!(envelope.success);
}

#[tokio::test]
async fn test_duplicate_api_prefix_is_collapsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let envelope = transport_for(&server)
        .send(&RequestDescriptor::get("api/events"))
        .await
        .unwrap();
    assert!(envelope.success);
}

// ============================================================================
// Credentials
// ============================================================================

#[tokio::test]
async fn test_cookie_is_replayed_to_backend_only() {
    let backend = MockServer::start().await;
    let cdn = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(204).insert_header("set-cookie", "session=abc; Path=/"))
        .mount(&backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("cookie", "session=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": { "id": "u-1" } })))
        .expect(1)
        .mount(&backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/poster.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 2, 3]))
        .mount(&cdn)
        .await;

    let transport = transport_for(&backend);
    let login = RequestDescriptor::post("auth/login").with_body(RequestBody::Json(json!({})));
    transport.send(&login).await.unwrap();

    let me = transport.send(&RequestDescriptor::get("auth/me")).await.unwrap();
    assert!(me.success);

    let poster = transport
        .send(&RequestDescriptor::get(format!("{}/poster.png", cdn.uri())))
        .await
        .unwrap();
    assert!(poster.success);

    let cdn_requests = cdn.received_requests().await.unwrap();
    assert_eq!(cdn_requests.len(), 1);
    assert!(cdn_requests[0].headers.get("cookie").is_none());
}

// ============================================================================
// Cancellation and timeouts
// ============================================================================

#[tokio::test]
async fn test_cancelled_request_resolves_promptly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    let token = CancelToken::new();
    let descriptor = RequestDescriptor::get("events").with_cancel(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let result = tokio::time::timeout(Duration::from_secs(2), transport.send(&descriptor))
        .await
        .expect("cancellation should resolve the request");
    canceller.await.unwrap();

    assert_eq!(result.unwrap_err(), TransportError::Cancelled);
}

#[tokio::test]
async fn test_configured_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let config = ClientConfig::new(format!("{}/api", server.uri()))
        .with_request_timeout(Duration::from_millis(100));
    let transport = HttpTransport::new(config).unwrap();

    let result = transport.send(&RequestDescriptor::get("events")).await;
    assert_eq!(result.unwrap_err(), TransportError::TimedOut);
}

#[tokio::test]
async fn test_unreachable_backend_is_a_transport_error() {
    let transport = HttpTransport::new(ClientConfig::new("http://127.0.0.1:9/api")).unwrap();

    let result = transport.send(&RequestDescriptor::get("events")).await;
    assert!(matches!(result, Err(TransportError::Network(_))));
}
