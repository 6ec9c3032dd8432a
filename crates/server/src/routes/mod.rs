//! HTTP route handlers for the Gobble API.
//!
//! # Route Structure
//!
//! ```text
//! # Auth (register/login rate-limited per client IP)
//! POST /api/auth/register/customer     - Register a customer
//! POST /api/auth/register/restaurant   - Register a restaurant (pending approval)
//! POST /api/auth/register/courier      - Register a courier (pending approval)
//! POST /api/auth/login                 - Issue a bearer token
//! POST /api/auth/logout                - Revoke the current token
//! GET  /api/auth/session               - Current principal
//!
//! # Browsing
//! GET  /api/restaurants                - Search open restaurants
//! GET  /api/restaurants/{id}           - Restaurant page with menu (cached)
//! GET  /api/restaurants/{id}/promotions - Live promotions for a restaurant
//!
//! # Customer
//! GET|DELETE  /api/cart                - Show or empty the cart
//! POST        /api/cart/items          - Add an item
//! PATCH|DELETE /api/cart/items/{menu_item_id} - Change quantity or remove
//! POST /api/checkout/quote             - Price the cart for an address
//! POST /api/coupons/validate           - Check a coupon code
//! GET|POST /api/orders                 - List orders or place one (idempotent)
//! GET  /api/orders/{id}                - Order detail
//! POST /api/orders/{id}/cancel         - Cancel a pending order
//! GET|POST /api/addresses              - Address book
//! PUT|DELETE /api/addresses/{id}
//! POST /api/addresses/{id}/default
//!
//! # Any account
//! GET|POST /api/messages               - Inbox or send
//! GET  /api/messages/sent
//! POST /api/messages/{id}/read
//! GET  /api/notifications
//! GET  /api/notifications/unread-count
//! POST /api/notifications/{id}/read
//! POST /api/notifications/read-all
//!
//! # Portals
//! /api/restaurant/*                    - Profile, menu, incoming orders, promotions
//! /api/courier/*                       - Profile, availability, deliveries
//! /api/admin/*                         - Dashboard, accounts, bans, coupons, promotions
//! ```

pub mod addresses;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod courier;
pub mod messages;
pub mod notifications;
pub mod orders;
pub mod restaurant_portal;
pub mod restaurants;

use axum::{
    Router,
    routing::{get, patch, post, put},
};

use gobble_core::api::PromotionInput;
use gobble_core::listing::PageRequest;
use serde::Deserialize;

use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// `?page&per_page` on plain list endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageQuery {
    #[must_use]
    pub fn page_request(self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }
}

/// Turn a validation failure into a 400.
pub(crate) fn check(result: std::result::Result<(), String>) -> Result<()> {
    result.map_err(AppError::BadRequest)
}

/// Shared by the restaurant portal and the admin promotion editor.
pub(crate) fn validate_promotion(input: &PromotionInput) -> Result<()> {
    check(crate::services::check_required("title", &input.title))?;
    if !(1..=100).contains(&input.percentage) {
        return Err(AppError::BadRequest(
            "percentage must be between 1 and 100".to_owned(),
        ));
    }
    if let (Some(starts), Some(ends)) = (input.starts_at, input.ends_at)
        && ends <= starts
    {
        return Err(AppError::BadRequest(
            "promotion must end after it starts".to_owned(),
        ));
    }
    Ok(())
}

/// Name the missing resource when a repository reports `NotFound`.
pub(crate) fn not_found(what: &'static str) -> impl Fn(RepositoryError) -> AppError {
    move |e| match e {
        RepositoryError::NotFound => AppError::NotFound(format!("{what} not found")),
        other => other.into(),
    }
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/register/customer", post(auth::register_customer))
        .route("/register/restaurant", post(auth::register_restaurant))
        .route("/register/courier", post(auth::register_courier))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter());

    Router::new()
        .merge(limited)
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::session))
}

/// Create the public restaurant routes router.
pub fn restaurant_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(restaurants::index))
        .route("/{id}", get(restaurants::show))
        .route("/{id}/promotions", get(restaurants::promotions))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route(
            "/items/{menu_item_id}",
            patch(cart::update).delete(cart::remove),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::place))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create the address book routes router.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(addresses::index).post(addresses::create))
        .route("/{id}", put(addresses::update).delete(addresses::destroy))
        .route("/{id}/default", post(addresses::set_default))
}

/// Create the messaging routes router.
pub fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(messages::inbox).post(messages::send))
        .route("/sent", get(messages::sent))
        .route("/{id}/read", post(messages::mark_read))
}

/// Create the notification routes router.
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::index))
        .route("/unread-count", get(notifications::unread_count))
        .route("/read-all", post(notifications::mark_all_read))
        .route("/{id}/read", post(notifications::mark_read))
}

/// Create the restaurant portal routes router.
pub fn restaurant_portal_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(restaurant_portal::profile).put(restaurant_portal::update_profile),
        )
        .route(
            "/menu",
            get(restaurant_portal::menu).post(restaurant_portal::create_menu_item),
        )
        .route(
            "/menu/{id}",
            put(restaurant_portal::update_menu_item).delete(restaurant_portal::delete_menu_item),
        )
        .route("/orders", get(restaurant_portal::orders))
        .route("/orders/{id}/accept", post(restaurant_portal::accept))
        .route("/orders/{id}/reject", post(restaurant_portal::reject))
        .route("/orders/{id}/ready", post(restaurant_portal::ready))
        .route(
            "/promotions",
            get(restaurant_portal::promotions).post(restaurant_portal::create_promotion),
        )
        .route(
            "/promotions/{id}",
            put(restaurant_portal::update_promotion).delete(restaurant_portal::delete_promotion),
        )
}

/// Create the courier portal routes router.
pub fn courier_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(courier::profile).put(courier::update_profile))
        .route("/availability", put(courier::set_availability))
        .route("/deliveries", get(courier::deliveries))
        .route("/orders", get(courier::orders))
        .route("/orders/{id}/claim", post(courier::claim))
        .route("/orders/{id}/pickup", post(courier::pick_up))
        .route("/orders/{id}/deliver", post(courier::deliver))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/accounts/{role}", get(admin::accounts))
        .route("/accounts/{role}/{id}/approval", put(admin::set_approval))
        .route("/bans", get(admin::bans).post(admin::create_ban))
        .route("/bans/{id}/lift", post(admin::lift_ban))
        .route("/coupons", get(admin::coupons).post(admin::create_coupon))
        .route(
            "/coupons/{id}",
            put(admin::update_coupon).delete(admin::delete_coupon),
        )
        .route(
            "/promotions",
            get(admin::promotions).post(admin::create_promotion),
        )
        .route(
            "/promotions/{id}",
            put(admin::update_promotion).delete(admin::delete_promotion),
        )
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes())
        .nest("/api/restaurants", restaurant_routes())
        .nest("/api/cart", cart_routes())
        .route("/api/checkout/quote", post(orders::quote))
        .route("/api/coupons/validate", post(orders::validate_coupon))
        .nest("/api/orders", order_routes())
        .nest("/api/addresses", address_routes())
        .nest("/api/messages", message_routes())
        .nest("/api/notifications", notification_routes())
        .nest("/api/restaurant", restaurant_portal_routes())
        .nest("/api/courier", courier_routes())
        .nest("/api/admin", admin_routes())
}
