//! Promotion database operations.

use chrono::{DateTime, Utc};
use gobble_core::api::PromotionInput;
use gobble_core::{PromotionId, RestaurantId};
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::Promotion;

const PROMOTION_COLUMNS: &str =
    "id, restaurant_id, title, percentage, starts_at, ends_at, is_active";

#[derive(Debug, sqlx::FromRow)]
struct PromotionRow {
    id: PromotionId,
    restaurant_id: Option<RestaurantId>,
    title: String,
    percentage: i16,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
    is_active: bool,
}

impl TryFrom<PromotionRow> for Promotion {
    type Error = RepositoryError;

    fn try_from(row: PromotionRow) -> Result<Self, Self::Error> {
        let percentage = u8::try_from(row.percentage).map_err(|_| {
            RepositoryError::DataCorruption(format!("invalid percentage: {}", row.percentage))
        })?;
        Ok(Self {
            id: row.id,
            restaurant_id: row.restaurant_id,
            title: row.title,
            percentage,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            is_active: row.is_active,
        })
    }
}

/// Repository for promotions.
pub struct PromotionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PromotionRepository<'a> {
    /// Create a new promotion repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All promotions, optionally limited to one restaurant's own.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        restaurant_id: Option<RestaurantId>,
    ) -> Result<Vec<Promotion>, RepositoryError> {
        let sql = format!(
            "SELECT {PROMOTION_COLUMNS} FROM gobble.promotion \
             WHERE $1::INTEGER IS NULL OR restaurant_id = $1 \
             ORDER BY starts_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, PromotionRow>(&sql)
            .bind(restaurant_id)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Promotions usable right now on orders from `restaurant_id`:
    /// its own plus platform-wide ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn live_for_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<Promotion>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {PROMOTION_COLUMNS}
            FROM gobble.promotion
            WHERE (restaurant_id IS NULL OR restaurant_id = $1)
              AND is_active
              AND starts_at <= now()
              AND (ends_at IS NULL OR ends_at > now())
            ORDER BY percentage DESC, id
            "
        );
        let rows = sqlx::query_as::<_, PromotionRow>(&sql)
            .bind(restaurant_id)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a promotion by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: PromotionId) -> Result<Option<Promotion>, RepositoryError> {
        let sql = format!("SELECT {PROMOTION_COLUMNS} FROM gobble.promotion WHERE id = $1");
        let row = sqlx::query_as::<_, PromotionRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a promotion.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &PromotionInput) -> Result<Promotion, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO gobble.promotion (restaurant_id, title, percentage, starts_at, ends_at, is_active)
            VALUES ($1, $2, $3, COALESCE($4, now()), $5, $6)
            RETURNING {PROMOTION_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, PromotionRow>(&sql)
            .bind(input.restaurant_id)
            .bind(input.title.trim())
            .bind(i16::from(input.percentage))
            .bind(input.starts_at)
            .bind(input.ends_at)
            .bind(input.is_active)
            .fetch_one(self.pool)
            .await?;

        row.try_into()
    }

    /// Replace a promotion. When `owner` is set, only that restaurant's own
    /// promotions match.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no matching promotion exists.
    pub async fn update(
        &self,
        id: PromotionId,
        owner: Option<RestaurantId>,
        input: &PromotionInput,
    ) -> Result<Promotion, RepositoryError> {
        let sql = format!(
            r"
            UPDATE gobble.promotion
            SET restaurant_id = $3, title = $4, percentage = $5,
                starts_at = COALESCE($6, starts_at), ends_at = $7, is_active = $8
            WHERE id = $1 AND ($2::INTEGER IS NULL OR restaurant_id = $2)
            RETURNING {PROMOTION_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, PromotionRow>(&sql)
            .bind(id)
            .bind(owner)
            .bind(input.restaurant_id)
            .bind(input.title.trim())
            .bind(i16::from(input.percentage))
            .bind(input.starts_at)
            .bind(input.ends_at)
            .bind(input.is_active)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Delete a promotion, scoped to `owner` when set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no matching promotion exists.
    pub async fn delete(
        &self,
        id: PromotionId,
        owner: Option<RestaurantId>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM gobble.promotion WHERE id = $1 AND ($2::INTEGER IS NULL OR restaurant_id = $2)",
        )
        .bind(id)
        .bind(owner)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
