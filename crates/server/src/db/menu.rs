//! Menu item database operations.

use std::collections::HashMap;

use gobble_core::api::MenuItemInput;
use gobble_core::{MenuItemId, Money, RestaurantId};
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::MenuItem;

const MENU_COLUMNS: &str = "id, restaurant_id, name, description, category, price, is_available";

#[derive(Debug, sqlx::FromRow)]
struct MenuItemRow {
    id: MenuItemId,
    restaurant_id: RestaurantId,
    name: String,
    description: String,
    category: String,
    price: Money,
    is_available: bool,
}

impl From<MenuItemRow> for MenuItem {
    fn from(row: MenuItemRow) -> Self {
        Self {
            id: row.id,
            restaurant_id: row.restaurant_id,
            name: row.name,
            description: row.description,
            category: row.category,
            price: row.price,
            is_available: row.is_available,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PriceRow {
    id: MenuItemId,
    price: Money,
}

/// Repository for menu items.
pub struct MenuRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MenuRepository<'a> {
    /// Create a new menu repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every item of a restaurant's menu, grouped by category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, restaurant_id: RestaurantId) -> Result<Vec<MenuItem>, RepositoryError> {
        let sql = format!(
            "SELECT {MENU_COLUMNS} FROM gobble.menu_item WHERE restaurant_id = $1 \
             ORDER BY category, name, id"
        );
        let rows = sqlx::query_as::<_, MenuItemRow>(&sql)
            .bind(restaurant_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Only the items customers can order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_available(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<MenuItem>, RepositoryError> {
        let sql = format!(
            "SELECT {MENU_COLUMNS} FROM gobble.menu_item \
             WHERE restaurant_id = $1 AND is_available ORDER BY category, name, id"
        );
        let rows = sqlx::query_as::<_, MenuItemRow>(&sql)
            .bind(restaurant_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a menu item by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: MenuItemId) -> Result<Option<MenuItem>, RepositoryError> {
        let sql = format!("SELECT {MENU_COLUMNS} FROM gobble.menu_item WHERE id = $1");
        let row = sqlx::query_as::<_, MenuItemRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Add an item to a restaurant's menu.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        restaurant_id: RestaurantId,
        input: &MenuItemInput,
    ) -> Result<MenuItem, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO gobble.menu_item (restaurant_id, name, description, category, price, is_available)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {MENU_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, MenuItemRow>(&sql)
            .bind(restaurant_id)
            .bind(input.name.trim())
            .bind(input.description.trim())
            .bind(input.category.trim())
            .bind(input.price)
            .bind(input.is_available)
            .fetch_one(self.pool)
            .await?;

        Ok(row.into())
    }

    /// Replace an item owned by `restaurant_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the restaurant has no such item.
    pub async fn update(
        &self,
        restaurant_id: RestaurantId,
        id: MenuItemId,
        input: &MenuItemInput,
    ) -> Result<MenuItem, RepositoryError> {
        let sql = format!(
            r"
            UPDATE gobble.menu_item
            SET name = $3, description = $4, category = $5, price = $6, is_available = $7,
                updated_at = now()
            WHERE id = $1 AND restaurant_id = $2
            RETURNING {MENU_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, MenuItemRow>(&sql)
            .bind(id)
            .bind(restaurant_id)
            .bind(input.name.trim())
            .bind(input.description.trim())
            .bind(input.category.trim())
            .bind(input.price)
            .bind(input.is_available)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete an item owned by `restaurant_id`.
    ///
    /// Past orders keep their snapshot; their `menu_item_id` becomes NULL.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the restaurant has no such item.
    pub async fn delete(
        &self,
        restaurant_id: RestaurantId,
        id: MenuItemId,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM gobble.menu_item WHERE id = $1 AND restaurant_id = $2")
                .bind(id)
                .bind(restaurant_id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Current prices of the given items that are still orderable from
    /// `restaurant_id`. Missing or unavailable items are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn current_prices(
        &self,
        restaurant_id: RestaurantId,
        ids: &[MenuItemId],
    ) -> Result<HashMap<MenuItemId, Money>, RepositoryError> {
        let raw_ids: Vec<i32> = ids.iter().map(MenuItemId::as_i32).collect();
        let rows = sqlx::query_as::<_, PriceRow>(
            r"
            SELECT id, price
            FROM gobble.menu_item
            WHERE restaurant_id = $1 AND is_available AND id = ANY($2)
            ",
        )
        .bind(restaurant_id)
        .bind(raw_ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| (r.id, r.price)).collect())
    }
}
