//! Coupon database operations.

use chrono::{DateTime, Utc};
use gobble_core::api::CouponInput;
use gobble_core::pricing::normalize_coupon_code;
use gobble_core::{CouponId, Money};
use sqlx::{PgConnection, PgPool};

use super::{RepositoryError, conflict_on_unique};
use crate::models::Coupon;

const COUPON_COLUMNS: &str =
    "id, code, amount, min_subtotal, max_uses, times_used, expires_at, is_active, created_at";

#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: CouponId,
    code: String,
    amount: Money,
    min_subtotal: Money,
    max_uses: Option<i32>,
    times_used: i32,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<CouponRow> for Coupon {
    fn from(row: CouponRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            amount: row.amount,
            min_subtotal: row.min_subtotal,
            max_uses: row.max_uses,
            times_used: row.times_used,
            expires_at: row.expires_at,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

/// Repository for coupons.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    /// Create a new coupon repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All coupons, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Coupon>, RepositoryError> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM gobble.coupon ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query_as::<_, CouponRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Look up a coupon by code, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM gobble.coupon WHERE code = $1");
        let row = sqlx::query_as::<_, CouponRow>(&sql)
            .bind(normalize_coupon_code(code))
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Create a coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code already exists.
    pub async fn create(&self, input: &CouponInput) -> Result<Coupon, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO gobble.coupon (code, amount, min_subtotal, max_uses, expires_at, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COUPON_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, CouponRow>(&sql)
            .bind(normalize_coupon_code(&input.code))
            .bind(input.amount)
            .bind(input.min_subtotal)
            .bind(input.max_uses)
            .bind(input.expires_at)
            .bind(input.is_active)
            .fetch_one(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "coupon code already exists"))?;

        Ok(row.into())
    }

    /// Replace a coupon's settings. Usage count is kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist, or
    /// `RepositoryError::Conflict` if the new code is taken.
    pub async fn update(&self, id: CouponId, input: &CouponInput) -> Result<Coupon, RepositoryError> {
        let sql = format!(
            r"
            UPDATE gobble.coupon
            SET code = $2, amount = $3, min_subtotal = $4, max_uses = $5,
                expires_at = $6, is_active = $7
            WHERE id = $1
            RETURNING {COUPON_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, CouponRow>(&sql)
            .bind(id)
            .bind(normalize_coupon_code(&input.code))
            .bind(input.amount)
            .bind(input.min_subtotal)
            .bind(input.max_uses)
            .bind(input.expires_at)
            .bind(input.is_active)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "coupon code already exists"))?
            .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a coupon. Orders that used it keep their amounts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist.
    pub async fn delete(&self, id: CouponId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM gobble.coupon WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Count one use of a coupon if it is still under its limit.
///
/// Returns `false` when the limit was reached concurrently.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn redeem_in(conn: &mut PgConnection, id: CouponId) -> Result<bool, RepositoryError> {
    let redeemed: Option<i32> = sqlx::query_scalar(
        r"
        UPDATE gobble.coupon
        SET times_used = times_used + 1
        WHERE id = $1 AND is_active AND (max_uses IS NULL OR times_used < max_uses)
        RETURNING id
        ",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(redeemed.is_some())
}

/// Give back one use of a coupon, for an order that was rejected or
/// cancelled.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn release_in(conn: &mut PgConnection, id: CouponId) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE gobble.coupon
        SET times_used = times_used - 1
        WHERE id = $1 AND times_used > 0
        ",
    )
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}
