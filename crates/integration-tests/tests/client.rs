//! `gobble-client` against an in-process mock of the API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use gobble_client::watch::{SessionState, spawn_notification_poll_every, spawn_session_watch_every};
use gobble_client::{ApiClient, CheckoutAttempt, ClientError, MemoryTokenStore, TokenStore};
use gobble_core::api::{
    CartConflictDetails, ErrorBody, LoginRequest, LoginResponse, OrderView, PlaceOrderRequest,
    SessionInfo, UnreadCount,
};
use gobble_core::cart::CartRestaurant;
use gobble_core::{
    AccountRole, AddressId, CustomerId, GeoPoint, Money, OrderId, OrderStatus, RestaurantId,
};
use gobble_integration_tests::serve;
use uuid::Uuid;

const TOKEN: &str = "tok-valid";

#[derive(Default)]
struct Mock {
    /// Idempotency key -> order id.
    orders: Mutex<HashMap<Uuid, i32>>,
    unread: Mutex<i64>,
}

fn error(status: StatusCode, code: &str, details: Option<serde_json::Value>) -> Response {
    let body = ErrorBody {
        error: code.to_owned(),
        message: format!("{code} happened"),
        details,
    };
    (status, Json(body)).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(&format!("Bearer {TOKEN}"))
}

fn session() -> SessionInfo {
    SessionInfo {
        role: AccountRole::Customer,
        account_id: 7,
        name: "Ada".to_owned(),
        email: "ada@example.com".to_owned(),
        approval_status: None,
        admin_role: None,
        expires_at: Utc::now() + chrono::Duration::hours(1),
    }
}

fn order(id: i32) -> OrderView {
    let now = Utc::now();
    OrderView {
        id: OrderId::new(id),
        customer_id: CustomerId::new(7),
        restaurant_id: RestaurantId::new(2),
        restaurant_name: "Dosa Hut".to_owned(),
        courier_id: None,
        status: OrderStatus::Pending,
        delivery_address: "1 Main St, Springfield".to_owned(),
        delivery_location: GeoPoint {
            latitude: 39.78,
            longitude: -89.65,
        },
        subtotal: Money::from_cents(1798),
        discount: Money::ZERO,
        delivery_fee: Money::from_cents(299),
        total: Money::from_cents(2097),
        promotion_id: None,
        coupon_id: None,
        note: None,
        rejection_reason: None,
        items: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

fn mock_api(state: Arc<Mock>) -> Router {
    Router::new()
        .route(
            "/api/auth/login",
            post(|Json(req): Json<LoginRequest>| async move {
                if req.password == "right-password" {
                    Json(LoginResponse {
                        token: TOKEN.to_owned(),
                        session: session(),
                    })
                    .into_response()
                } else {
                    error(StatusCode::UNAUTHORIZED, "invalid_credentials", None)
                }
            }),
        )
        .route(
            "/api/auth/session",
            get(|headers: HeaderMap| async move {
                if authorized(&headers) {
                    Json(session()).into_response()
                } else {
                    error(StatusCode::UNAUTHORIZED, "unauthorized", None)
                }
            }),
        )
        .route(
            "/api/cart/items",
            post(|headers: HeaderMap| async move {
                if !authorized(&headers) {
                    return error(StatusCode::UNAUTHORIZED, "unauthorized", None);
                }
                let details = serde_json::to_value(CartConflictDetails {
                    current_restaurant: CartRestaurant {
                        id: RestaurantId::new(2),
                        name: "Dosa Hut".to_owned(),
                    },
                })
                .unwrap();
                error(StatusCode::CONFLICT, "cart_conflict", Some(details))
            }),
        )
        .route(
            "/api/orders",
            post(
                |State(state): State<Arc<Mock>>, Json(req): Json<PlaceOrderRequest>| async move {
                    let mut orders = state.orders.lock().unwrap();
                    let next = i32::try_from(orders.len()).unwrap() + 100;
                    match orders.get(&req.idempotency_key) {
                        Some(id) => (StatusCode::OK, Json(order(*id))),
                        None => {
                            orders.insert(req.idempotency_key, next);
                            (StatusCode::CREATED, Json(order(next)))
                        }
                    }
                },
            ),
        )
        .route(
            "/api/orders/{id}",
            get(|Path(id): Path<i32>| async move {
                error(StatusCode::NOT_FOUND, "not_found", Some(serde_json::json!({ "id": id })))
            }),
        )
        .route(
            "/api/notifications/unread-count",
            get(|State(state): State<Arc<Mock>>| async move {
                Json(UnreadCount {
                    unread: *state.unread.lock().unwrap(),
                })
            }),
        )
        .with_state(state)
}

async fn client_for(state: Arc<Mock>) -> (ApiClient, Arc<MemoryTokenStore>) {
    let base = serve(mock_api(state)).await;
    let tokens = Arc::new(MemoryTokenStore::new());
    let client = ApiClient::new(&base, tokens.clone()).unwrap();
    (client, tokens)
}

#[tokio::test]
async fn test_login_stores_token() {
    let (client, tokens) = client_for(Arc::default()).await;
    let session = client
        .login(AccountRole::Customer, "ada@example.com", "right-password")
        .await
        .unwrap();
    assert_eq!(session.account_id, 7);
    assert!(tokens.load().is_some());
    assert_eq!(client.session().await.unwrap().name, "Ada");
}

#[tokio::test]
async fn test_failed_login_keeps_state_and_message() {
    let (client, tokens) = client_for(Arc::default()).await;
    tokens.save("old-token").unwrap();
    let err = client
        .login(AccountRole::Customer, "ada@example.com", "wrong")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some("invalid_credentials"));
    assert_eq!(err.user_message(), "Incorrect email or password.");
    // A bad password is not an expired session.
    assert!(tokens.load().is_some());
}

#[tokio::test]
async fn test_rejected_token_is_cleared() {
    let (client, tokens) = client_for(Arc::default()).await;
    tokens.save("stale-token").unwrap();
    let err = client.session().await.unwrap_err();
    assert!(matches!(err, ClientError::SessionExpired));
    assert!(tokens.load().is_none());
    assert!(!client.has_token());
}

#[tokio::test]
async fn test_cart_conflict_names_current_restaurant() {
    let (client, tokens) = client_for(Arc::default()).await;
    tokens.save(TOKEN).unwrap();
    let err = client
        .add_to_cart(gobble_core::MenuItemId::new(9), 1, false)
        .await
        .unwrap_err();
    match err {
        ClientError::CartConflict {
            current_restaurant, ..
        } => assert_eq!(current_restaurant.name, "Dosa Hut"),
        other => panic!("expected cart conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_not_found_is_generic_api_error() {
    let (client, _tokens) = client_for(Arc::default()).await;
    let err = client.order(OrderId::new(5)).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 404, .. }));
}

#[tokio::test]
async fn test_checkout_retry_reuses_key() {
    let state = Arc::new(Mock::default());
    let (client, _tokens) = client_for(state.clone()).await;

    let attempt = CheckoutAttempt::new(AddressId::new(1)).with_note("Leave at door");
    let first = attempt.submit(&client).await.unwrap();
    let retry = attempt.submit(&client).await.unwrap();
    assert!(!first.replayed);
    assert!(retry.replayed);
    assert_eq!(first.order.id, retry.order.id);

    let other = CheckoutAttempt::new(AddressId::new(1))
        .submit(&client)
        .await
        .unwrap();
    assert_ne!(other.order.id, first.order.id);
    assert_eq!(state.orders.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_session_watch_tracks_expiry() {
    let (client, tokens) = client_for(Arc::default()).await;
    tokens.save(TOKEN).unwrap();

    let handle = spawn_session_watch_every(client, Duration::from_millis(20));
    let mut rx = handle.subscribe();
    rx.wait_for(SessionState::is_active).await.unwrap();

    // Simulate server-side revocation.
    tokens.save("revoked").unwrap();
    rx.wait_for(|state| *state == SessionState::LoggedOut)
        .await
        .unwrap();
    assert!(tokens.load().is_none());
}

#[tokio::test]
async fn test_notification_poll_publishes_count() {
    let state = Arc::new(Mock::default());
    *state.unread.lock().unwrap() = 3;
    let (client, tokens) = client_for(state.clone()).await;
    tokens.save(TOKEN).unwrap();

    let handle = spawn_notification_poll_every(client, Duration::from_millis(20));
    let mut rx = handle.subscribe();
    rx.wait_for(|count| *count == 3).await.unwrap();

    *state.unread.lock().unwrap() = 0;
    rx.wait_for(|count| *count == 0).await.unwrap();

    drop(handle);
    assert!(rx.changed().await.is_err());
}
