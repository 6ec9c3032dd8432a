//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Errors render as a JSON
//! [`ErrorBody`] with a stable `error` code the client can branch on. Server
//! errors are captured to Sentry and their details never reach the client.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use gobble_core::api::{BannedDetails, CartConflictDetails, ErrorBody};
use gobble_core::cart::CartError;
use gobble_core::checkout::CheckoutError;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartServiceError;
use crate::services::checkout::CheckoutServiceError;
use crate::services::moderation::ModerationError;
use crate::services::orders::OrderServiceError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartServiceError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutServiceError),

    #[error("Order error: {0}")]
    Order(#[from] OrderServiceError),

    #[error("Moderation error: {0}")]
    Moderation(#[from] ModerationError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Status, code, client message, and optional details of an error.
struct Rendered {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<Value>,
}

impl Rendered {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: impl Serialize) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }

    fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error",
        )
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict", message)
    }
}

fn render_repository(err: &RepositoryError) -> Rendered {
    match err {
        RepositoryError::NotFound => Rendered::not_found("Not found"),
        RepositoryError::Conflict(what) => Rendered::conflict(what.clone()),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => Rendered::internal(),
    }
}

fn render_auth(err: &AuthError) -> Rendered {
    match err {
        AuthError::InvalidEmail(_) => Rendered::bad_request("Invalid email address"),
        AuthError::WeakPassword(msg) | AuthError::InvalidInput(msg) => {
            Rendered::bad_request(msg.clone())
        }
        AuthError::InvalidCredentials => Rendered::new(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "Invalid email or password",
        ),
        AuthError::AccountExists => {
            Rendered::conflict("An account with this email already exists")
        }
        AuthError::MissingToken | AuthError::InvalidToken => Rendered::new(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "Session expired, please log in again",
        ),
        AuthError::Banned { until, reason } => Rendered::new(
            StatusCode::FORBIDDEN,
            "account_banned",
            until.map_or_else(
                || "Your account has been permanently suspended".to_string(),
                |until| format!("Your account is suspended until {}", until.to_rfc3339()),
            ),
        )
        .with_details(BannedDetails {
            until: *until,
            reason: reason.clone(),
        }),
        AuthError::Repository(e) => render_repository(e),
        AuthError::PasswordHash | AuthError::TokenDigest => Rendered::internal(),
    }
}

fn render_cart(err: &CartServiceError) -> Rendered {
    match err {
        CartServiceError::Cart(CartError::DifferentRestaurant { current }) => Rendered::new(
            StatusCode::CONFLICT,
            "cart_conflict",
            format!(
                "Your cart contains items from {}. Replace it to order from here.",
                current.name
            ),
        )
        .with_details(CartConflictDetails {
            current_restaurant: current.clone(),
        }),
        CartServiceError::Cart(CartError::ItemNotInCart(_)) | CartServiceError::ItemNotFound(_) => {
            Rendered::not_found(err.to_string())
        }
        CartServiceError::Cart(CartError::ItemUnavailable(_))
        | CartServiceError::ItemUnavailable(_) => {
            Rendered::new(StatusCode::CONFLICT, "item_unavailable", err.to_string())
        }
        CartServiceError::Cart(e) => Rendered::bad_request(e.to_string()),
        CartServiceError::RestaurantUnavailable => Rendered::new(
            StatusCode::CONFLICT,
            "restaurant_unavailable",
            "This restaurant is not taking orders",
        ),
        CartServiceError::Repository(e) => render_repository(e),
    }
}

fn render_checkout(err: &CheckoutServiceError) -> Rendered {
    match err {
        CheckoutServiceError::Checkout(CheckoutError::EmptyCart) => {
            Rendered::bad_request("Your cart is empty")
        }
        CheckoutServiceError::Checkout(CheckoutError::MissingAddress) => {
            Rendered::bad_request("Choose a delivery address")
        }
        CheckoutServiceError::Checkout(CheckoutError::OutOfRange {
            distance_km,
            radius_km,
        }) => Rendered::new(
            StatusCode::BAD_REQUEST,
            "out_of_range",
            "This address is outside the restaurant's delivery area",
        )
        .with_details(json!({ "distance_km": distance_km, "radius_km": radius_km })),
        CheckoutServiceError::Pricing(e) => Rendered::bad_request(e.to_string()),
        CheckoutServiceError::AddressNotFound => Rendered::not_found("Address not found"),
        CheckoutServiceError::PromotionInvalid(msg) => {
            Rendered::new(StatusCode::BAD_REQUEST, "promotion_invalid", msg.clone())
        }
        CheckoutServiceError::CouponInvalid(msg) => {
            Rendered::new(StatusCode::BAD_REQUEST, "coupon_invalid", msg.clone())
        }
        CheckoutServiceError::PricesChanged(changes) => Rendered::new(
            StatusCode::CONFLICT,
            "prices_changed",
            "Some prices changed. Please review your cart.",
        )
        .with_details(json!({ "price_changes": changes })),
        CheckoutServiceError::ItemUnavailable(_) => {
            Rendered::new(StatusCode::CONFLICT, "item_unavailable", err.to_string())
        }
        CheckoutServiceError::RestaurantUnavailable => Rendered::new(
            StatusCode::CONFLICT,
            "restaurant_unavailable",
            "This restaurant is not taking orders",
        ),
        CheckoutServiceError::Repository(e) => render_repository(e),
    }
}

fn render_order(err: &OrderServiceError) -> Rendered {
    match err {
        OrderServiceError::NotFound => Rendered::not_found("Order not found"),
        OrderServiceError::InvalidTransition { .. } | OrderServiceError::Conflict(_) => {
            Rendered::conflict(err.to_string())
        }
        OrderServiceError::InvalidInput(msg) => Rendered::bad_request(msg.clone()),
        OrderServiceError::Repository(e) => render_repository(e),
    }
}

fn render_moderation(err: &ModerationError) -> Rendered {
    match err {
        ModerationError::AccountNotFound | ModerationError::BanNotFound => {
            Rendered::not_found(err.to_string())
        }
        ModerationError::Duration(e) => Rendered::bad_request(e.to_string()),
        ModerationError::InvalidInput(msg) => Rendered::bad_request(msg.clone()),
        ModerationError::Repository(e) => render_repository(e),
    }
}

impl AppError {
    fn render(&self) -> Rendered {
        match self {
            Self::Database(e) => render_repository(e),
            Self::Auth(e) => render_auth(e),
            Self::Cart(e) => render_cart(e),
            Self::Checkout(e) => render_checkout(e),
            Self::Order(e) => render_order(e),
            Self::Moderation(e) => render_moderation(e),
            Self::NotFound(msg) => Rendered::not_found(msg.clone()),
            Self::Unauthorized(msg) => {
                Rendered::new(StatusCode::UNAUTHORIZED, "unauthorized", msg.clone())
            }
            Self::Forbidden(msg) => Rendered::new(StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            Self::Conflict(msg) => Rendered::conflict(msg.clone()),
            Self::BadRequest(msg) => Rendered::bad_request(msg.clone()),
            Self::Internal(_) => Rendered::internal(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let rendered = self.render();

        // Capture server errors to Sentry
        if rendered.status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = ErrorBody {
            error: rendered.code.to_string(),
            message: rendered.message,
            details: rendered.details,
        };
        let mut response = (rendered.status, Json(body)).into_response();
        if rendered.status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the authenticated account.
pub fn set_sentry_user(account: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(account.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the account.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use gobble_core::cart::CartRestaurant;
    use gobble_core::{MenuItemId, Money, RestaurantId};

    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order 7".to_string());
        assert_eq!(err.to_string(), "Not found: order 7");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::AccountExists)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Order(OrderServiceError::InvalidTransition {
                from: gobble_core::OrderStatus::Delivered,
                to: gobble_core::OrderStatus::Cancelled,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_cart_conflict_carries_current_restaurant() {
        let current = CartRestaurant {
            id: RestaurantId::new(3),
            name: "Pho Real".to_string(),
        };
        let err = AppError::Cart(CartServiceError::Cart(CartError::DifferentRestaurant {
            current: current.clone(),
        }));

        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error, "cart_conflict");
        let details: CartConflictDetails = serde_json::from_value(body.details.unwrap()).unwrap();
        assert_eq!(details.current_restaurant, current);
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let err = AppError::Database(RepositoryError::DataCorruption(
            "secret table layout".to_string(),
        ));
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "internal_error");
        assert!(!body.message.contains("secret"));
    }

    #[tokio::test]
    async fn test_banned_reports_end_time() {
        let until = chrono::Utc::now() + chrono::Duration::days(3);
        let err = AppError::Auth(AuthError::Banned {
            until: Some(until),
            reason: "Abusive messages".to_string(),
        });
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.error, "account_banned");
        let details: BannedDetails = serde_json::from_value(body.details.unwrap()).unwrap();
        assert_eq!(details.until, Some(until));
    }

    #[tokio::test]
    async fn test_prices_changed_lists_changes() {
        let err = AppError::Checkout(CheckoutServiceError::PricesChanged(vec![
            gobble_core::cart::PriceChange {
                menu_item_id: MenuItemId::new(4),
                old_price: Money::from_cents(900),
                new_price: Money::from_cents(1100),
            },
        ]));
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error, "prices_changed");
        assert_eq!(body.details.unwrap()["price_changes"][0]["menu_item_id"], 4);
    }

    #[test]
    fn test_unauthorized_sets_challenge() {
        let response = AppError::Auth(AuthError::InvalidToken).into_response();
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }
}
