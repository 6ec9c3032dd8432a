//! Router tests that never reach the database.
//!
//! The pool points at a closed port, so anything that gets as far as a
//! query fails; these tests cover what is decided before that.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use gobble_integration_tests::{offline_app, send};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_health() {
    let app = offline_app();
    let resp = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, json!("ok"));
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let app = offline_app();
    let resp = send(&app, Method::GET, "/health/ready", None, None).await;
    assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = offline_app();
    for (method, uri) in [
        (Method::GET, "/api/cart"),
        (Method::GET, "/api/orders"),
        (Method::GET, "/api/auth/session"),
        (Method::GET, "/api/notifications/unread-count"),
        (Method::GET, "/api/restaurant/menu"),
        (Method::PUT, "/api/courier/availability"),
        (Method::GET, "/api/admin/dashboard"),
    ] {
        let resp = send(&app, method.clone(), uri, None, None).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(resp.error_code(), "unauthorized", "{method} {uri}");
    }
}

#[tokio::test]
async fn test_malformed_authorization_is_unauthorized() {
    let app = offline_app();
    let request = Request::builder()
        .uri("/api/cart")
        .header(header::AUTHORIZATION, "Basic Zm9vOmJhcg==")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = offline_app();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "checkout-42")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(request).await.unwrap();
    assert_eq!(resp.headers()["x-request-id"], "checkout-42");
    assert_eq!(resp.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
}

#[tokio::test]
async fn test_request_id_is_generated() {
    let app = offline_app();
    let resp = send(&app, Method::GET, "/health", None, None).await;
    let id = resp.headers["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn test_cors_preflight_allows_front_end_origin() {
    let app = offline_app();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/cart/items")
        .header(header::ORIGIN, "http://app.gobble.test")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(request).await.unwrap();
    assert_eq!(
        resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://app.gobble.test"
    );
}

#[tokio::test]
async fn test_cors_ignores_other_origins() {
    let app = offline_app();
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(request).await.unwrap();
    assert!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = offline_app();
    let resp = send(&app, Method::GET, "/api/nope", None, None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}
