//! Integration tests for re-authentication and the session cache over HTTP.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use boxoffice_client::{ClientConfig, ClientContext, ClientError, HttpTransport};
use boxoffice_core::{RequestBody, RequestDescriptor, Role, SessionStorage};
use boxoffice_testing::{fixtures, init_test_tracing, MemoryStorage};
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Test Fixtures
// ============================================================================

fn context_for(server: &MockServer) -> (ClientContext<HttpTransport>, Arc<MemoryStorage>) {
    init_test_tracing();
    let storage = Arc::new(MemoryStorage::new());
    let context = ClientContext::connect(
        ClientConfig::new(format!("{}/api", server.uri())),
        storage.clone(),
    )
    .unwrap();
    (context, storage)
}

/// `GET /api/orders` answers 200 only with the renewed cookie, 401 otherwise.
async fn mount_cookie_gated_orders(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .and(header("cookie", "session=renewed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "orders": [] })))
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Token expired" })))
        .with_priority(2)
        .mount(server)
        .await;
}

// ============================================================================
// Single-flight refresh
// ============================================================================

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh_and_all_succeed() {
    let server = MockServer::start().await;
    mount_cookie_gated_orders(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(204)
                .insert_header("set-cookie", "session=renewed; Path=/")
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (context, _) = context_for(&server);
    let client = context.client();
    let descriptor = RequestDescriptor::get("orders");

    let results = join_all((0..5).map(|_| client.request(&descriptor))).await;

    assert!(results.iter().all(Result::is_ok), "{results:?}");
    assert_eq!(client.refresh_coordinator().exchange_count(), 1);
    server.verify().await;
}

#[tokio::test]
async fn test_concurrent_401s_all_surface_auth_expired_when_refresh_fails() {
    let server = MockServer::start().await;
    mount_cookie_gated_orders(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&server)
        .await;

    let (context, storage) = context_for(&server);
    storage.set("boxoffice.isAuthenticated", "true");
    let client = context.client();
    let descriptor = RequestDescriptor::get("orders");

    let results = join_all((0..5).map(|_| client.request(&descriptor))).await;

    for result in &results {
        assert!(
            matches!(result, Err(ClientError::AuthExpired { status: 401, message }) if message == "Token expired"),
            "{result:?}"
        );
    }
    assert!(storage.is_empty());
    server.verify().await;
}

// ============================================================================
// Error taxonomy
// ============================================================================

#[tokio::test]
async fn test_validation_error_surfaces_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({ "message": "Invalid pincode" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let (context, _) = context_for(&server);
    let descriptor = RequestDescriptor::post("orders").with_body(RequestBody::Json(json!({ "pincode": "1" })));

    let error = context.client().request(&descriptor).await.unwrap_err();

    assert_eq!(error.status(), Some(422));
    assert!(matches!(error, ClientError::Api { ref message, .. } if message == "Invalid pincode"));
    server.verify().await;
}

// ============================================================================
// Session cache
// ============================================================================

#[tokio::test]
async fn test_ten_concurrent_session_calls_issue_one_identity_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(fixtures::identity_payload("u-1", "Organiser"))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (context, storage) = context_for(&server);
    let results = join_all((0..10).map(|_| context.session(false))).await;

    let first = results[0].clone().unwrap();
    assert!(results.iter().all(|r| r.as_ref() == Ok(&first)));
    assert_eq!(first.role, Role::Organizer);
    assert_eq!(storage.get("boxoffice.role").as_deref(), Some("ORGANIZER"));
    server.verify().await;
}

#[tokio::test]
async fn test_signed_out_identity_resolves_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let (context, _) = context_for(&server);
    let record = context.session(false).await.unwrap();

    assert!(!record.is_authenticated);
    assert!(record.user.is_none());
    assert!(!context.hint().is_authenticated);
    server.verify().await;
}

#[tokio::test]
async fn test_logout_survives_backend_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::identity_payload("u-1", "user")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let (context, storage) = context_for(&server);
    context.session(false).await.unwrap();
    assert!(!storage.is_empty());

    context.logout().await;

    assert!(storage.is_empty());
    assert!(context.client().session_state().record().is_none());
    server.verify().await;
}
