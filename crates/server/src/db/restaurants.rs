//! Restaurant database operations.

use chrono::{DateTime, Utc};
use gobble_core::api::{RegisterRestaurant, RestaurantProfileInput, RestaurantSearch};
use gobble_core::listing::Page;
use gobble_core::{ApprovalStatus, Email, RestaurantId};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::bans::ACTIVE_BAN_SQL;
use super::{RepositoryError, conflict_on_unique, count, geo_point, parse_email};
use crate::models::Restaurant;

const RESTAURANT_COLUMNS: &str = "r.id, r.email, r.name, r.description, r.cuisine, r.phone, \
     r.street, r.city, r.latitude, r.longitude, r.delivery_radius_km, r.approval_status, \
     r.created_at, r.updated_at";

#[derive(Debug, sqlx::FromRow)]
struct RestaurantRow {
    id: i32,
    email: String,
    name: String,
    description: String,
    cuisine: String,
    phone: String,
    street: String,
    city: String,
    latitude: f64,
    longitude: f64,
    delivery_radius_km: f64,
    approval_status: ApprovalStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RestaurantRow> for Restaurant {
    type Error = RepositoryError;

    fn try_from(row: RestaurantRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: RestaurantId::new(row.id),
            email: parse_email(&row.email)?,
            name: row.name,
            description: row.description,
            cuisine: row.cuisine,
            phone: row.phone,
            street: row.street,
            city: row.city,
            location: geo_point(row.latitude, row.longitude)?,
            delivery_radius_km: row.delivery_radius_km,
            approval_status: row.approval_status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for restaurant accounts and profiles.
pub struct RestaurantRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RestaurantRepository<'a> {
    /// Create a new restaurant repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Register a restaurant. New restaurants start `pending`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    pub async fn create(
        &self,
        email: &Email,
        input: &RegisterRestaurant,
        password_hash: &str,
    ) -> Result<Restaurant, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO gobble.restaurant AS r
                (email, password_hash, name, description, cuisine, phone, street, city,
                 latitude, longitude, delivery_radius_km)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {RESTAURANT_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, RestaurantRow>(&sql)
            .bind(email.as_str())
            .bind(password_hash)
            .bind(input.name.trim())
            .bind(input.description.trim())
            .bind(input.cuisine.trim())
            .bind(input.phone.trim())
            .bind(input.street.trim())
            .bind(input.city.trim())
            .bind(input.location.latitude)
            .bind(input.location.longitude)
            .bind(input.delivery_radius_km)
            .fetch_one(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "email already exists"))?;

        row.try_into()
    }

    /// Get a restaurant by ID, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: RestaurantId) -> Result<Option<Restaurant>, RepositoryError> {
        let sql = format!("SELECT {RESTAURANT_COLUMNS} FROM gobble.restaurant r WHERE r.id = $1");
        let row = sqlx::query_as::<_, RestaurantRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a restaurant customers can order from: accepted and not banned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_open(&self, id: RestaurantId) -> Result<Option<Restaurant>, RepositoryError> {
        let sql = format!(
            "SELECT {RESTAURANT_COLUMNS} FROM gobble.restaurant r \
             WHERE r.id = $1 AND r.approval_status = 'accepted' AND NOT {}",
            banned_predicate()
        );
        let row = sqlx::query_as::<_, RestaurantRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Public restaurant search, by name/description and cuisine.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(
        &self,
        search: &RestaurantSearch,
    ) -> Result<Page<Restaurant>, RepositoryError> {
        let page_request = search.page_request();

        let mut select: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {RESTAURANT_COLUMNS} FROM gobble.restaurant r"));
        push_search_filters(&mut select, search);
        select.push(" ORDER BY r.name ASC, r.id ASC LIMIT ");
        select.push_bind(page_request.limit());
        select.push(" OFFSET ");
        select.push_bind(page_request.offset());

        let rows: Vec<RestaurantRow> = select.build_query_as().fetch_all(self.pool).await?;

        let mut total_query: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM gobble.restaurant r");
        push_search_filters(&mut total_query, search);
        let total: i64 = total_query.build_query_scalar().fetch_one(self.pool).await?;

        let items = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<Restaurant>, _>>()?;

        Ok(Page::new(items, page_request, count(total)))
    }

    /// Update the restaurant's public profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the restaurant does not exist.
    pub async fn update_profile(
        &self,
        id: RestaurantId,
        input: &RestaurantProfileInput,
    ) -> Result<Restaurant, RepositoryError> {
        let sql = format!(
            r"
            UPDATE gobble.restaurant AS r
            SET name = $2, description = $3, cuisine = $4, phone = $5, street = $6,
                city = $7, latitude = $8, longitude = $9, delivery_radius_km = $10,
                updated_at = now()
            WHERE r.id = $1
            RETURNING {RESTAURANT_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, RestaurantRow>(&sql)
            .bind(id)
            .bind(input.name.trim())
            .bind(input.description.trim())
            .bind(input.cuisine.trim())
            .bind(input.phone.trim())
            .bind(input.street.trim())
            .bind(input.city.trim())
            .bind(input.location.latitude)
            .bind(input.location.longitude)
            .bind(input.delivery_radius_km)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }
}

/// `EXISTS` clause matching an active ban on restaurant `r`.
fn banned_predicate() -> String {
    format!(
        "EXISTS (SELECT 1 FROM gobble.ban b WHERE b.target_role = 'restaurant' \
         AND b.target_id = r.id AND {ACTIVE_BAN_SQL})"
    )
}

fn push_search_filters<'q>(builder: &mut QueryBuilder<'q, Postgres>, search: &'q RestaurantSearch) {
    builder.push(format!(
        " WHERE r.approval_status = 'accepted' AND NOT {}",
        banned_predicate()
    ));
    if let Some(text) = search.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{text}%");
        builder.push(" AND (r.name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR r.description ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    if let Some(cuisine) = search.cuisine.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        builder.push(" AND lower(r.cuisine) = lower(");
        builder.push_bind(cuisine.to_owned());
        builder.push(")");
    }
}
