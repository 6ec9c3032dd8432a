//! Database operations for the Gobble `PostgreSQL` database.
//!
//! # Schema: `gobble`
//!
//! ## Tables
//!
//! - `customer`, `restaurant`, `courier`, `admin_user` - Accounts, one table per role
//! - `auth_token` - HMAC digests of issued bearer tokens
//! - `menu_item` - Restaurant menus
//! - `address` - Customer delivery addresses
//! - `cart` - One JSONB cart per customer
//! - `customer_order`, `order_item` - Orders with price snapshots
//! - `coupon`, `promotion` - Discounts
//! - `ban` - Account suspensions
//! - `message`, `notification` - Messaging between accounts
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p gobble-cli -- migrate
//! ```

pub mod accounts;
pub mod addresses;
pub mod bans;
pub mod carts;
pub mod coupons;
pub mod couriers;
pub mod menu;
pub mod messages;
pub mod notifications;
pub mod orders;
pub mod promotions;
pub mod restaurants;
pub mod stats;
pub mod tokens;

use std::time::Duration;

use gobble_core::{Email, GeoPoint};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use accounts::AccountRepository;
pub use addresses::AddressRepository;
pub use bans::BanRepository;
pub use carts::CartRepository;
pub use coupons::CouponRepository;
pub use couriers::CourierRepository;
pub use menu::MenuRepository;
pub use messages::MessageRepository;
pub use notifications::NotificationRepository;
pub use orders::OrderRepository;
pub use promotions::PromotionRepository;
pub use restaurants::RestaurantRepository;
pub use stats::StatsRepository;
pub use tokens::TokenRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Schema migrations in `crates/server/migrations`, embedded at build time.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

// =============================================================================
// Row helpers
// =============================================================================

/// Map a unique violation to `RepositoryError::Conflict`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(what.to_owned());
    }
    RepositoryError::Database(e)
}

pub(crate) fn parse_email(raw: &str) -> Result<Email, RepositoryError> {
    Email::parse(raw)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))
}

pub(crate) fn geo_point(latitude: f64, longitude: f64) -> Result<GeoPoint, RepositoryError> {
    GeoPoint::new(latitude, longitude)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid coordinates: {e}")))
}

pub(crate) fn optional_geo_point(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<Option<GeoPoint>, RepositoryError> {
    match (latitude, longitude) {
        (Some(lat), Some(lng)) => geo_point(lat, lng).map(Some),
        (None, None) => Ok(None),
        _ => Err(RepositoryError::DataCorruption(
            "half-set coordinates".to_owned(),
        )),
    }
}

/// Convert a stored quantity (`INTEGER CHECK 1..=99`) back to `u32`.
pub(crate) fn quantity(raw: i32) -> Result<u32, RepositoryError> {
    u32::try_from(raw)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative quantity: {raw}")))
}

/// Convert a `COUNT(*)` result to `u64`.
pub(crate) fn count(raw: i64) -> u64 {
    u64::try_from(raw).unwrap_or(0)
}
