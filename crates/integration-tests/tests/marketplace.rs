//! End-to-end marketplace flows against a real database.
//!
//! These tests require a `PostgreSQL` database at `GOBBLE_TEST_DATABASE_URL`.
//! Migrations are applied automatically. Every test uses fresh emails and a
//! location of its own, so runs do not interfere with each other.
//!
//! Run with: `cargo test -p gobble-integration-tests -- --ignored`

use axum::Router;
use axum::http::{Method, StatusCode};
use gobble_core::{AdminRole, Email, Money};
use gobble_integration_tests::{TestResponse, app_with_pool, migrated_pool, send};
use gobble_server::db::AccountRepository;
use gobble_server::services::auth::hash_password;
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

const PASSWORD: &str = "correct-horse-battery";

fn money(value: &Value) -> Money {
    serde_json::from_value(value.clone()).unwrap()
}

/// Per-test identity: unique email suffix and a spot on the map nobody
/// else is using.
struct Fixture {
    app: Router,
    pool: PgPool,
    tag: String,
    latitude: f64,
    longitude: f64,
}

impl Fixture {
    async fn new() -> Self {
        let pool = migrated_pool().await;
        let id = Uuid::new_v4();
        let [lat, lon, ..] = *id.as_bytes();
        Self {
            app: app_with_pool(pool.clone()),
            pool,
            tag: id.simple().to_string(),
            latitude: f64::from(lat) / 255.0 * 100.0 - 50.0,
            longitude: f64::from(lon) / 255.0 * 300.0 - 150.0,
        }
    }

    fn email(&self, who: &str) -> String {
        format!("{who}-{}@gobble.test", self.tag)
    }

    fn here(&self, offset: f64) -> Value {
        json!({ "latitude": self.latitude + offset, "longitude": self.longitude })
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        send(&self.app, method, uri, token, body).await
    }

    async fn login(&self, role: &str, who: &str) -> String {
        let resp = self
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "role": role, "email": self.email(who), "password": PASSWORD })),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "{:?}", resp.body);
        resp.body["token"].as_str().unwrap().to_owned()
    }

    async fn admin(&self) -> String {
        let email = Email::parse(&self.email("admin")).unwrap();
        AccountRepository::new(&self.pool)
            .create_admin(&email, "Ops", AdminRole::SuperAdmin, &hash_password(PASSWORD).unwrap())
            .await
            .unwrap();
        self.login("admin", "admin").await
    }

    async fn approve(&self, admin: &str, role: &str, id: i64) {
        let resp = self
            .call(
                Method::PUT,
                &format!("/api/admin/accounts/{role}/{id}/approval"),
                Some(admin),
                Some(json!({ "status": "ACCEPTED" })),
            )
            .await;
        assert_eq!(resp.status, StatusCode::NO_CONTENT, "{:?}", resp.body);
    }

    /// An approved restaurant with one menu item. Returns (token, item id).
    async fn restaurant(&self, admin: &str) -> (String, i64) {
        let resp = self
            .call(
                Method::POST,
                "/api/auth/register/restaurant",
                None,
                Some(json!({
                    "email": self.email("kitchen"),
                    "password": PASSWORD,
                    "name": "Pho Real",
                    "cuisine": "Vietnamese",
                    "phone": "+1 555 0101",
                    "street": "12 Market Street",
                    "city": "Springfield",
                    "location": self.here(0.0),
                    "delivery_radius_km": 5.0
                })),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.body);
        assert_eq!(resp.body["approval_status"], "PENDING");
        let restaurant_id = resp.body["account_id"].as_i64().unwrap();

        let token = self.login("restaurant", "kitchen").await;
        let blocked = self
            .call(Method::GET, "/api/restaurant/menu", Some(&token), None)
            .await;
        assert_eq!(blocked.status, StatusCode::FORBIDDEN);

        self.approve(admin, "restaurant", restaurant_id).await;

        let item = self
            .call(
                Method::POST,
                "/api/restaurant/menu",
                Some(&token),
                Some(json!({ "name": "Pho Tai", "category": "Soups", "price": "12.00" })),
            )
            .await;
        assert_eq!(item.status, StatusCode::CREATED, "{:?}", item.body);
        (token, item.body["id"].as_i64().unwrap())
    }

    /// A customer with one address. Returns (token, address id).
    async fn customer(&self) -> (String, i64) {
        let resp = self
            .call(
                Method::POST,
                "/api/auth/register/customer",
                None,
                Some(json!({ "email": self.email("diner"), "password": PASSWORD, "name": "Ada" })),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.body);
        let token = self.login("customer", "diner").await;

        let address = self
            .call(
                Method::POST,
                "/api/addresses",
                Some(&token),
                Some(json!({
                    "label": "Home",
                    "street": "1 Main St",
                    "city": "Springfield",
                    "location": self.here(0.01),
                    "is_default": true
                })),
            )
            .await;
        assert_eq!(address.status, StatusCode::CREATED, "{:?}", address.body);
        (token, address.body["id"].as_i64().unwrap())
    }

    /// An approved courier. Returns (token, courier id).
    async fn courier(&self, admin: &str) -> (String, i64) {
        let resp = self
            .call(
                Method::POST,
                "/api/auth/register/courier",
                None,
                Some(json!({
                    "email": self.email("rider"),
                    "password": PASSWORD,
                    "name": "Sam",
                    "phone": "+1 555 0199",
                    "vehicle": "bicycle"
                })),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.body);
        let id = resp.body["account_id"].as_i64().unwrap();
        self.approve(admin, "courier", id).await;
        (self.login("courier", "rider").await, id)
    }

    async fn add_to_cart(&self, diner: &str, item_id: i64, quantity: u32) -> TestResponse {
        self.call(
            Method::POST,
            "/api/cart/items",
            Some(diner),
            Some(json!({ "menu_item_id": item_id, "quantity": quantity })),
        )
        .await
    }

    async fn place(&self, diner: &str, mut body: Value) -> TestResponse {
        body["idempotency_key"] = json!(Uuid::new_v4());
        self.call(Method::POST, "/api/orders", Some(diner), Some(body)).await
    }

    /// A coupon with a code unique to this test. Returns the code.
    async fn coupon(&self, admin: &str, mut input: Value) -> String {
        let code = format!("SAVE{}", self.tag).to_uppercase();
        input["code"] = json!(code);
        let resp = self
            .call(Method::POST, "/api/admin/coupons", Some(admin), Some(input))
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{:?}", resp.body);
        code
    }

    async fn coupon_uses(&self, admin: &str, code: &str) -> i64 {
        let list = self
            .call(Method::GET, "/api/admin/coupons", Some(admin), None)
            .await;
        list.body
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["code"] == code)
            .unwrap()["times_used"]
            .as_i64()
            .unwrap()
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (GOBBLE_TEST_DATABASE_URL)"]
async fn test_order_lifecycle_with_dispatch() {
    let fx = Fixture::new().await;
    let admin = fx.admin().await;
    let (kitchen, item_id) = fx.restaurant(&admin).await;
    let (diner, address_id) = fx.customer().await;
    let (rider, rider_id) = fx.courier(&admin).await;

    // Fill the cart.
    let cart = fx
        .call(
            Method::POST,
            "/api/cart/items",
            Some(&diner),
            Some(json!({ "menu_item_id": item_id, "quantity": 2 })),
        )
        .await;
    assert_eq!(cart.status, StatusCode::OK, "{:?}", cart.body);
    assert_eq!(cart.body["item_count"], 2);
    assert_eq!(money(&cart.body["subtotal"]), Money::from_cents(2400));

    // Quote, then place twice with the same key.
    let quote = fx
        .call(
            Method::POST,
            "/api/checkout/quote",
            Some(&diner),
            Some(json!({ "address_id": address_id })),
        )
        .await;
    assert_eq!(quote.status, StatusCode::OK, "{:?}", quote.body);
    assert_eq!(money(&quote.body["totals"]["delivery_fee"]), Money::from_cents(299));

    let key = Uuid::new_v4();
    let order_body = json!({ "idempotency_key": key, "address_id": address_id });
    let placed = fx
        .call(Method::POST, "/api/orders", Some(&diner), Some(order_body.clone()))
        .await;
    assert_eq!(placed.status, StatusCode::CREATED, "{:?}", placed.body);
    assert_eq!(placed.body["status"], "PENDING");
    assert_eq!(money(&placed.body["total"]), Money::from_cents(2699));
    let order_id = placed.body["id"].as_i64().unwrap();

    let replay = fx
        .call(Method::POST, "/api/orders", Some(&diner), Some(order_body))
        .await;
    assert_eq!(replay.status, StatusCode::OK);
    assert_eq!(replay.body["id"].as_i64(), Some(order_id));

    let cart = fx.call(Method::GET, "/api/cart", Some(&diner), None).await;
    assert_eq!(cart.body["item_count"], 0);

    // Restaurant accepts; the customer can no longer cancel.
    let accepted = fx
        .call(
            Method::POST,
            &format!("/api/restaurant/orders/{order_id}/accept"),
            Some(&kitchen),
            None,
        )
        .await;
    assert_eq!(accepted.body["status"], "ACCEPTED");
    let cancel = fx
        .call(Method::POST, &format!("/api/orders/{order_id}/cancel"), Some(&diner), None)
        .await;
    assert_eq!(cancel.status, StatusCode::CONFLICT);

    // Courier comes on duty next to the restaurant, then the order is ready.
    let duty = fx
        .call(
            Method::PUT,
            "/api/courier/availability",
            Some(&rider),
            Some(json!({ "is_available": true, "location": fx.here(0.0) })),
        )
        .await;
    assert_eq!(duty.status, StatusCode::OK, "{:?}", duty.body);

    let ready = fx
        .call(
            Method::POST,
            &format!("/api/restaurant/orders/{order_id}/ready"),
            Some(&kitchen),
            None,
        )
        .await;
    assert_eq!(ready.body["status"], "READY");
    assert_eq!(ready.body["courier_id"].as_i64(), Some(rider_id));

    for (step, status) in [("pickup", "PICKED_UP"), ("deliver", "DELIVERED")] {
        let resp = fx
            .call(
                Method::POST,
                &format!("/api/courier/orders/{order_id}/{step}"),
                Some(&rider),
                None,
            )
            .await;
        assert_eq!(resp.body["status"], status, "{:?}", resp.body);
    }

    let unread = fx
        .call(Method::GET, "/api/notifications/unread-count", Some(&diner), None)
        .await;
    assert!(unread.body["unread"].as_i64().unwrap() >= 3);

    // Off duty so later runs never see this courier.
    fx.call(
        Method::PUT,
        "/api/courier/availability",
        Some(&rider),
        Some(json!({ "is_available": false })),
    )
    .await;
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (GOBBLE_TEST_DATABASE_URL)"]
async fn test_cart_conflict_then_replace() {
    let fx = Fixture::new().await;
    let admin = fx.admin().await;
    let (_kitchen, item_id) = fx.restaurant(&admin).await;
    let (diner, _address_id) = fx.customer().await;

    // A second restaurant, registered under another email.
    let other = fx
        .call(
            Method::POST,
            "/api/auth/register/restaurant",
            None,
            Some(json!({
                "email": fx.email("other-kitchen"),
                "password": PASSWORD,
                "name": "Dosa Hut",
                "cuisine": "Indian",
                "phone": "+1 555 0102",
                "street": "4 Elm Avenue",
                "city": "Springfield",
                "location": fx.here(0.02),
                "delivery_radius_km": 5.0
            })),
        )
        .await;
    let other_id = other.body["account_id"].as_i64().unwrap();
    fx.approve(&admin, "restaurant", other_id).await;
    let other_token = fx.login("restaurant", "other-kitchen").await;
    let dosa = fx
        .call(
            Method::POST,
            "/api/restaurant/menu",
            Some(&other_token),
            Some(json!({ "name": "Masala Dosa", "price": "8.99" })),
        )
        .await;
    let dosa_id = dosa.body["id"].as_i64().unwrap();

    let (fx_ref, diner_ref): (&Fixture, &str) = (&fx, &diner);
    let add = move |item: i64, replace: bool| {
        fx_ref.call(
            Method::POST,
            "/api/cart/items",
            Some(diner_ref),
            Some(json!({ "menu_item_id": item, "quantity": 1, "replace_existing": replace })),
        )
    };

    assert_eq!(add(item_id, false).await.status, StatusCode::OK);

    let conflict = add(dosa_id, false).await;
    assert_eq!(conflict.status, StatusCode::CONFLICT);
    assert_eq!(conflict.error_code(), "cart_conflict");
    assert_eq!(conflict.body["details"]["current_restaurant"]["name"], "Pho Real");

    let replaced = add(dosa_id, true).await;
    assert_eq!(replaced.status, StatusCode::OK);
    assert_eq!(replaced.body["restaurant"]["name"], "Dosa Hut");
    assert_eq!(replaced.body["item_count"], 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (GOBBLE_TEST_DATABASE_URL)"]
async fn test_ban_revokes_session_and_blocks_login() {
    let fx = Fixture::new().await;
    let admin = fx.admin().await;
    let (diner, _address_id) = fx.customer().await;

    let session = fx.call(Method::GET, "/api/auth/session", Some(&diner), None).await;
    let customer_id = session.body["account_id"].as_i64().unwrap();

    let ban = fx
        .call(
            Method::POST,
            "/api/admin/bans",
            Some(&admin),
            Some(json!({
                "target": { "role": "customer", "id": customer_id },
                "reason": "chargeback abuse",
                "duration": "7d"
            })),
        )
        .await;
    assert_eq!(ban.status, StatusCode::CREATED, "{:?}", ban.body);

    let revoked = fx.call(Method::GET, "/api/cart", Some(&diner), None).await;
    assert_eq!(revoked.status, StatusCode::UNAUTHORIZED);

    let login = fx
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "role": "customer", "email": fx.email("diner"), "password": PASSWORD })),
        )
        .await;
    assert_eq!(login.status, StatusCode::FORBIDDEN);
    assert_eq!(login.error_code(), "account_banned");
    assert_eq!(login.body["details"]["reason"], "chargeback abuse");

    // Lifting restores access.
    let ban_id = ban.body["id"].as_i64().unwrap();
    let lifted = fx
        .call(Method::POST, &format!("/api/admin/bans/{ban_id}/lift"), Some(&admin), None)
        .await;
    assert_eq!(lifted.status, StatusCode::OK);
    fx.login("customer", "diner").await;
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (GOBBLE_TEST_DATABASE_URL)"]
async fn test_checkout_rejects_address_outside_delivery_area() {
    let fx = Fixture::new().await;
    let admin = fx.admin().await;
    let (_kitchen, item_id) = fx.restaurant(&admin).await;
    let (diner, _home) = fx.customer().await;

    // A degree of latitude is over 100 km; the restaurant delivers within 5.
    let far = fx
        .call(
            Method::POST,
            "/api/addresses",
            Some(&diner),
            Some(json!({
                "label": "Cabin",
                "street": "99 Lake Road",
                "city": "Faraway",
                "location": fx.here(1.0)
            })),
        )
        .await;
    assert_eq!(far.status, StatusCode::CREATED, "{:?}", far.body);
    let far_id = far.body["id"].as_i64().unwrap();

    assert_eq!(fx.add_to_cart(&diner, item_id, 1).await.status, StatusCode::OK);

    let quote = fx
        .call(
            Method::POST,
            "/api/checkout/quote",
            Some(&diner),
            Some(json!({ "address_id": far_id })),
        )
        .await;
    assert_eq!(quote.status, StatusCode::BAD_REQUEST);
    assert_eq!(quote.error_code(), "out_of_range");

    let placed = fx.place(&diner, json!({ "address_id": far_id })).await;
    assert_eq!(placed.status, StatusCode::BAD_REQUEST);
    assert_eq!(placed.error_code(), "out_of_range");
    assert!(placed.body["details"]["distance_km"].as_f64().unwrap() > 5.0);

    // Nothing was ordered, so the cart is intact.
    let cart = fx.call(Method::GET, "/api/cart", Some(&diner), None).await;
    assert_eq!(cart.body["item_count"], 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (GOBBLE_TEST_DATABASE_URL)"]
async fn test_checkout_rejects_promotion_with_coupon() {
    let fx = Fixture::new().await;
    let admin = fx.admin().await;
    let (kitchen, item_id) = fx.restaurant(&admin).await;
    let (diner, address_id) = fx.customer().await;
    let code = fx.coupon(&admin, json!({ "amount": "2.00" })).await;

    let promotion = fx
        .call(
            Method::POST,
            "/api/restaurant/promotions",
            Some(&kitchen),
            Some(json!({ "title": "Soup season", "percentage": 10 })),
        )
        .await;
    assert_eq!(promotion.status, StatusCode::CREATED, "{:?}", promotion.body);
    let promotion_id = promotion.body["id"].as_i64().unwrap();

    assert_eq!(fx.add_to_cart(&diner, item_id, 1).await.status, StatusCode::OK);

    let both = fx
        .place(
            &diner,
            json!({ "address_id": address_id, "promotion_id": promotion_id, "coupon_code": code }),
        )
        .await;
    assert_eq!(both.status, StatusCode::BAD_REQUEST);
    assert_eq!(both.error_code(), "bad_request");

    // Either one alone is fine: 10% of 12.00.
    let promoted = fx
        .place(&diner, json!({ "address_id": address_id, "promotion_id": promotion_id }))
        .await;
    assert_eq!(promoted.status, StatusCode::CREATED, "{:?}", promoted.body);
    assert_eq!(money(&promoted.body["discount"]), Money::from_cents(120));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (GOBBLE_TEST_DATABASE_URL)"]
async fn test_checkout_reprices_stale_cart() {
    let fx = Fixture::new().await;
    let admin = fx.admin().await;
    let (kitchen, item_id) = fx.restaurant(&admin).await;
    let (diner, address_id) = fx.customer().await;

    assert_eq!(fx.add_to_cart(&diner, item_id, 2).await.status, StatusCode::OK);

    let raised = fx
        .call(
            Method::PUT,
            &format!("/api/restaurant/menu/{item_id}"),
            Some(&kitchen),
            Some(json!({ "name": "Pho Tai", "category": "Soups", "price": "13.50" })),
        )
        .await;
    assert_eq!(raised.status, StatusCode::OK, "{:?}", raised.body);

    let key = Uuid::new_v4();
    let body = json!({ "idempotency_key": key, "address_id": address_id });
    let stale = fx
        .call(Method::POST, "/api/orders", Some(&diner), Some(body.clone()))
        .await;
    assert_eq!(stale.status, StatusCode::CONFLICT);
    assert_eq!(stale.error_code(), "prices_changed");
    let change = &stale.body["details"]["price_changes"][0];
    assert_eq!(change["menu_item_id"].as_i64(), Some(item_id));
    assert_eq!(money(&change["old_price"]), Money::from_cents(1200));
    assert_eq!(money(&change["new_price"]), Money::from_cents(1350));

    // The cart now carries the new price.
    let cart = fx.call(Method::GET, "/api/cart", Some(&diner), None).await;
    assert_eq!(money(&cart.body["subtotal"]), Money::from_cents(2700));

    // Confirming with the same key goes through at the new price.
    let placed = fx
        .call(Method::POST, "/api/orders", Some(&diner), Some(body))
        .await;
    assert_eq!(placed.status, StatusCode::CREATED, "{:?}", placed.body);
    assert_eq!(money(&placed.body["subtotal"]), Money::from_cents(2700));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (GOBBLE_TEST_DATABASE_URL)"]
async fn test_coupon_below_minimum_subtotal() {
    let fx = Fixture::new().await;
    let admin = fx.admin().await;
    let (_kitchen, item_id) = fx.restaurant(&admin).await;
    let (diner, address_id) = fx.customer().await;
    let code = fx
        .coupon(&admin, json!({ "amount": "5.00", "min_subtotal": "30.00" }))
        .await;

    assert_eq!(fx.add_to_cart(&diner, item_id, 1).await.status, StatusCode::OK);

    let rejected = fx
        .place(&diner, json!({ "address_id": address_id, "coupon_code": code }))
        .await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
    assert_eq!(rejected.error_code(), "coupon_invalid");
    assert_eq!(fx.coupon_uses(&admin, &code).await, 0);

    // 3 x 12.00 clears the minimum.
    assert_eq!(fx.add_to_cart(&diner, item_id, 2).await.status, StatusCode::OK);
    let placed = fx
        .place(&diner, json!({ "address_id": address_id, "coupon_code": code }))
        .await;
    assert_eq!(placed.status, StatusCode::CREATED, "{:?}", placed.body);
    assert_eq!(money(&placed.body["discount"]), Money::from_cents(500));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (GOBBLE_TEST_DATABASE_URL)"]
async fn test_coupon_use_returned_when_order_rejected_or_cancelled() {
    let fx = Fixture::new().await;
    let admin = fx.admin().await;
    let (kitchen, item_id) = fx.restaurant(&admin).await;
    let (diner, address_id) = fx.customer().await;
    let code = fx
        .coupon(&admin, json!({ "amount": "2.00", "max_uses": 1 }))
        .await;
    let with_coupon = json!({ "address_id": address_id, "coupon_code": code });

    fx.add_to_cart(&diner, item_id, 1).await;
    let first = fx.place(&diner, with_coupon.clone()).await;
    assert_eq!(first.status, StatusCode::CREATED, "{:?}", first.body);
    assert_eq!(fx.coupon_uses(&admin, &code).await, 1);

    // At its limit.
    fx.add_to_cart(&diner, item_id, 1).await;
    let exhausted = fx.place(&diner, with_coupon.clone()).await;
    assert_eq!(exhausted.status, StatusCode::BAD_REQUEST);
    assert_eq!(exhausted.error_code(), "coupon_invalid");

    // The restaurant turns the first order down; the use comes back.
    let first_id = first.body["id"].as_i64().unwrap();
    let rejected = fx
        .call(
            Method::POST,
            &format!("/api/restaurant/orders/{first_id}/reject"),
            Some(&kitchen),
            Some(json!({ "reason": "Out of broth" })),
        )
        .await;
    assert_eq!(rejected.body["status"], "REJECTED", "{:?}", rejected.body);
    assert_eq!(fx.coupon_uses(&admin, &code).await, 0);

    let second = fx.place(&diner, with_coupon).await;
    assert_eq!(second.status, StatusCode::CREATED, "{:?}", second.body);
    assert_eq!(fx.coupon_uses(&admin, &code).await, 1);

    // Same for a customer cancellation.
    let second_id = second.body["id"].as_i64().unwrap();
    let cancelled = fx
        .call(Method::POST, &format!("/api/orders/{second_id}/cancel"), Some(&diner), None)
        .await;
    assert_eq!(cancelled.body["status"], "CANCELLED", "{:?}", cancelled.body);
    assert_eq!(fx.coupon_uses(&admin, &code).await, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (GOBBLE_TEST_DATABASE_URL)"]
async fn test_concurrent_cart_changes_are_not_lost() {
    let fx = Fixture::new().await;
    let admin = fx.admin().await;
    let (kitchen, pho_id) = fx.restaurant(&admin).await;
    let (diner, address_id) = fx.customer().await;

    let roll = fx
        .call(
            Method::POST,
            "/api/restaurant/menu",
            Some(&kitchen),
            Some(json!({ "name": "Spring Roll", "category": "Starters", "price": "4.50" })),
        )
        .await;
    let roll_id = roll.body["id"].as_i64().unwrap();

    // Two adds at once both land.
    let (a, b) = tokio::join!(
        fx.add_to_cart(&diner, pho_id, 1),
        fx.add_to_cart(&diner, roll_id, 1)
    );
    assert_eq!(a.status, StatusCode::OK);
    assert_eq!(b.status, StatusCode::OK);
    let cart = fx.call(Method::GET, "/api/cart", Some(&diner), None).await;
    assert_eq!(cart.body["item_count"], 2);

    fx.call(Method::DELETE, "/api/cart", Some(&diner), None).await;
    fx.add_to_cart(&diner, pho_id, 1).await;

    // An add racing an order ends up either in the order or still in the
    // cart, never in neither.
    let (placed, added) = tokio::join!(
        fx.place(&diner, json!({ "address_id": address_id })),
        fx.add_to_cart(&diner, roll_id, 1)
    );
    assert_eq!(placed.status, StatusCode::CREATED, "{:?}", placed.body);
    assert_eq!(added.status, StatusCode::OK);

    let ordered = placed.body["items"].as_array().unwrap().len();
    let cart = fx.call(Method::GET, "/api/cart", Some(&diner), None).await;
    let left = cart.body["items"].as_array().map_or(0, Vec::len);
    assert_eq!(ordered + left, 2);
}
