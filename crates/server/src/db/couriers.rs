//! Courier database operations.

use chrono::{DateTime, Utc};
use gobble_core::api::{CourierProfileInput, RegisterCourier};
use gobble_core::dispatch::CourierCandidate;
use gobble_core::{ApprovalStatus, CourierId, Email, GeoPoint};
use sqlx::PgPool;

use super::bans::ACTIVE_BAN_SQL;
use super::{RepositoryError, conflict_on_unique, geo_point, optional_geo_point, parse_email};
use crate::models::Courier;

const COURIER_COLUMNS: &str = "id, email, name, phone, vehicle, approval_status, is_available, \
     latitude, longitude, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct CourierRow {
    id: i32,
    email: String,
    name: String,
    phone: String,
    vehicle: String,
    approval_status: ApprovalStatus,
    is_available: bool,
    latitude: Option<f64>,
    longitude: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CourierRow> for Courier {
    type Error = RepositoryError;

    fn try_from(row: CourierRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CourierId::new(row.id),
            email: parse_email(&row.email)?,
            name: row.name,
            phone: row.phone,
            vehicle: row.vehicle,
            approval_status: row.approval_status,
            is_available: row.is_available,
            location: optional_geo_point(row.latitude, row.longitude)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    id: i32,
    latitude: f64,
    longitude: f64,
}

/// Repository for courier accounts.
pub struct CourierRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CourierRepository<'a> {
    /// Create a new courier repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Register a courier. New couriers start `pending` and unavailable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    pub async fn create(
        &self,
        email: &Email,
        input: &RegisterCourier,
        password_hash: &str,
    ) -> Result<Courier, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO gobble.courier (email, password_hash, name, phone, vehicle)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COURIER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, CourierRow>(&sql)
            .bind(email.as_str())
            .bind(password_hash)
            .bind(input.name.trim())
            .bind(input.phone.trim())
            .bind(input.vehicle.trim())
            .fetch_one(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "email already exists"))?;

        row.try_into()
    }

    /// Get a courier by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CourierId) -> Result<Option<Courier>, RepositoryError> {
        let sql = format!("SELECT {COURIER_COLUMNS} FROM gobble.courier WHERE id = $1");
        let row = sqlx::query_as::<_, CourierRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Update name, phone, and vehicle.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the courier does not exist.
    pub async fn update_profile(
        &self,
        id: CourierId,
        input: &CourierProfileInput,
    ) -> Result<Courier, RepositoryError> {
        let sql = format!(
            r"
            UPDATE gobble.courier
            SET name = $2, phone = $3, vehicle = $4, updated_at = now()
            WHERE id = $1
            RETURNING {COURIER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, CourierRow>(&sql)
            .bind(id)
            .bind(input.name.trim())
            .bind(input.phone.trim())
            .bind(input.vehicle.trim())
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Set availability, and the last known location when one is given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the courier does not exist.
    pub async fn set_availability(
        &self,
        id: CourierId,
        is_available: bool,
        location: Option<GeoPoint>,
    ) -> Result<Courier, RepositoryError> {
        let sql = format!(
            r"
            UPDATE gobble.courier
            SET is_available = $2,
                latitude = COALESCE($3, latitude),
                longitude = COALESCE($4, longitude),
                updated_at = now()
            WHERE id = $1
            RETURNING {COURIER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, CourierRow>(&sql)
            .bind(id)
            .bind(is_available)
            .bind(location.map(|l| l.latitude))
            .bind(location.map(|l| l.longitude))
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Couriers that can take a new delivery right now: accepted, available,
    /// located, not banned, and not already carrying an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn dispatch_candidates(&self) -> Result<Vec<CourierCandidate>, RepositoryError> {
        let sql = format!(
            r"
            SELECT c.id, c.latitude, c.longitude
            FROM gobble.courier c
            WHERE c.approval_status = 'accepted'
              AND c.is_available
              AND c.latitude IS NOT NULL
              AND c.longitude IS NOT NULL
              AND NOT EXISTS (
                  SELECT 1 FROM gobble.ban b
                  WHERE b.target_role = 'courier' AND b.target_id = c.id AND {ACTIVE_BAN_SQL}
              )
              AND NOT EXISTS (
                  SELECT 1 FROM gobble.customer_order o
                  WHERE o.courier_id = c.id
                    AND o.status IN ('accepted', 'ready', 'picked_up')
              )
            "
        );
        let rows = sqlx::query_as::<_, CandidateRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter()
            .map(|r| {
                Ok(CourierCandidate {
                    id: CourierId::new(r.id),
                    location: geo_point(r.latitude, r.longitude)?,
                    is_available: true,
                })
            })
            .collect()
    }
}
