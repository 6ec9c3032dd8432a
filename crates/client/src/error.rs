//! Client-side errors and the messages shown for them.

use chrono::{DateTime, Utc};
use gobble_core::cart::{CartRestaurant, PriceChange};
use thiserror::Error;

/// Errors returned by [`crate::ApiClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never got a response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The stored token was rejected. It has already been cleared.
    #[error("session expired")]
    SessionExpired,

    /// The cart holds items from another restaurant.
    #[error("cart conflict with {}", current_restaurant.name)]
    CartConflict {
        current_restaurant: CartRestaurant,
        message: String,
    },

    /// Menu prices moved since the cart was filled. The server has already
    /// updated the cart.
    #[error("{} prices changed", .0.len())]
    PricesChanged(Vec<PriceChange>),

    /// The account is suspended.
    #[error("account banned")]
    Banned {
        until: Option<DateTime<Utc>>,
        reason: String,
    },

    /// Any other non-success response.
    #[error("API error: {status} {code} - {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// A success response whose body did not parse.
    #[error("parse error: {0}")]
    Parse(String),

    /// Reading or writing the token store failed.
    #[error("token store error: {0}")]
    TokenStore(String),
}

impl ClientError {
    /// Stable error code from the server, if there is one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::SessionExpired => Some("unauthorized"),
            Self::CartConflict { .. } => Some("cart_conflict"),
            Self::PricesChanged(_) => Some("prices_changed"),
            Self::Banned { .. } => Some("account_banned"),
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Text fit for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(_) => "Could not reach Gobble. Check your connection and try again.".to_owned(),
            Self::SessionExpired => "Your session has expired. Please log in again.".to_owned(),
            Self::CartConflict {
                current_restaurant, ..
            } => format!(
                "Your cart has items from {}. Clear it to order from this restaurant.",
                current_restaurant.name
            ),
            Self::PricesChanged(_) => {
                "Some prices have changed. Please review your cart before ordering.".to_owned()
            }
            Self::Banned { until: Some(until), .. } => format!(
                "Your account is suspended until {}.",
                until.format("%Y-%m-%d %H:%M UTC")
            ),
            Self::Banned { until: None, .. } => "Your account has been suspended.".to_owned(),
            Self::Api {
                status, message, ..
            } => match status {
                400 | 409 | 422 => message.clone(),
                401 => "Incorrect email or password.".to_owned(),
                403 => "You do not have permission to do that.".to_owned(),
                404 => "We couldn't find what you were looking for.".to_owned(),
                429 => "Too many attempts. Please wait a minute and try again.".to_owned(),
                500.. => "Something went wrong on our side. Please try again later.".to_owned(),
                _ => "Something went wrong. Please try again.".to_owned(),
            },
            Self::Url(_) | Self::Parse(_) | Self::TokenStore(_) => {
                "Something went wrong. Please try again.".to_owned()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use gobble_core::{Money, RestaurantId, MenuItemId};

    use super::*;

    fn api(status: u16, message: &str) -> ClientError {
        ClientError::Api {
            status,
            code: "x".to_owned(),
            message: message.to_owned(),
        }
    }

    #[test]
    fn test_validation_messages_pass_through() {
        assert_eq!(
            api(400, "street is required").user_message(),
            "street is required"
        );
        assert_eq!(
            api(409, "order 4 changed; reload and try again").user_message(),
            "order 4 changed; reload and try again"
        );
    }

    #[test]
    fn test_server_errors_are_canned() {
        let msg = api(503, "connection pool exhausted").user_message();
        assert!(!msg.contains("pool"));
        assert!(api(429, "").user_message().contains("Too many"));
        assert!(api(403, "viewers have read-only access").user_message().contains("permission"));
    }

    #[test]
    fn test_cart_conflict_names_restaurant() {
        let err = ClientError::CartConflict {
            current_restaurant: CartRestaurant {
                id: RestaurantId::new(2),
                name: "Thai Basil".to_owned(),
            },
            message: String::new(),
        };
        assert!(err.user_message().contains("Thai Basil"));
        assert_eq!(err.code(), Some("cart_conflict"));
    }

    #[test]
    fn test_prices_changed() {
        let err = ClientError::PricesChanged(vec![PriceChange {
            menu_item_id: MenuItemId::new(1),
            old_price: Money::from_cents(900),
            new_price: Money::from_cents(1000),
        }]);
        assert_eq!(err.to_string(), "1 prices changed");
        assert!(err.user_message().contains("prices"));
    }

    #[test]
    fn test_session_expired() {
        let err = ClientError::SessionExpired;
        assert_eq!(err.code(), Some("unauthorized"));
        assert!(err.user_message().contains("log in"));
    }
}
