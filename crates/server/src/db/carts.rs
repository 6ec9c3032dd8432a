//! Cart persistence.
//!
//! Each customer has at most one cart row holding the whole cart as JSONB.
//! An empty cart is stored as no row.
//!
//! Changes are read-modify-write, so every writer first takes the customer's
//! cart lock with [`lock_in`] inside its transaction. An empty cart has no
//! row, so the lock is a transaction-scoped advisory lock.

use gobble_core::CustomerId;
use gobble_core::cart::Cart;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use super::RepositoryError;

/// First key of the advisory lock pair; the second is the customer id.
const CART_LOCK_CLASS: i32 = 0x6361_7274;

/// Repository for customer carts.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load the customer's cart, empty if none was saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored JSON does not
    /// decode into a cart.
    pub async fn get(&self, customer_id: CustomerId) -> Result<Cart, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        get_in(&mut conn, customer_id).await
    }

    /// Remove the customer's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, customer_id: CustomerId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_in(&mut *tx, customer_id).await?;
        delete_in(&mut *tx, customer_id).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Take the customer's cart lock until the surrounding transaction ends.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the lock query fails.
pub async fn lock_in(
    conn: &mut PgConnection,
    customer_id: CustomerId,
) -> Result<(), RepositoryError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
        .bind(CART_LOCK_CLASS)
        .bind(customer_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Load the customer's cart on an existing connection or transaction.
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` if the stored JSON does not
/// decode into a cart.
pub async fn get_in(
    conn: &mut PgConnection,
    customer_id: CustomerId,
) -> Result<Cart, RepositoryError> {
    let contents: Option<Json<serde_json::Value>> =
        sqlx::query_scalar("SELECT contents FROM gobble.cart WHERE customer_id = $1")
            .bind(customer_id)
            .fetch_optional(conn)
            .await?;

    match contents {
        Some(Json(value)) => serde_json::from_value(value)
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid cart: {e}"))),
        None => Ok(Cart::new()),
    }
}

/// Persist the cart, removing the row when it is empty.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the write fails.
pub async fn save_in(
    conn: &mut PgConnection,
    customer_id: CustomerId,
    cart: &Cart,
) -> Result<(), RepositoryError> {
    if cart.is_empty() {
        return delete_in(conn, customer_id).await;
    }

    sqlx::query(
        r"
        INSERT INTO gobble.cart (customer_id, contents)
        VALUES ($1, $2)
        ON CONFLICT (customer_id)
        DO UPDATE SET contents = EXCLUDED.contents, updated_at = now()
        ",
    )
    .bind(customer_id)
    .bind(Json(cart))
    .execute(conn)
    .await?;

    Ok(())
}

/// Remove the customer's cart on an existing connection or transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn delete_in(
    conn: &mut PgConnection,
    customer_id: CustomerId,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM gobble.cart WHERE customer_id = $1")
        .bind(customer_id)
        .execute(conn)
        .await?;
    Ok(())
}
