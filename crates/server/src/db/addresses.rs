//! Customer address database operations.

use gobble_core::api::AddressInput;
use gobble_core::{AddressId, CustomerId};
use sqlx::PgPool;

use super::{RepositoryError, geo_point};
use crate::models::Address;

const ADDRESS_COLUMNS: &str =
    "id, customer_id, label, street, city, postal_code, latitude, longitude, is_default";

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    customer_id: CustomerId,
    label: String,
    street: String,
    city: String,
    postal_code: String,
    latitude: f64,
    longitude: f64,
    is_default: bool,
}

impl TryFrom<AddressRow> for Address {
    type Error = RepositoryError;

    fn try_from(row: AddressRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            customer_id: row.customer_id,
            label: row.label,
            street: row.street,
            city: row.city,
            postal_code: row.postal_code,
            location: geo_point(row.latitude, row.longitude)?,
            is_default: row.is_default,
        })
    }
}

/// Repository for customer addresses.
///
/// Every query is scoped by customer, so a customer can never read or change
/// another customer's address.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Addresses of a customer, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, customer_id: CustomerId) -> Result<Vec<Address>, RepositoryError> {
        let sql = format!(
            "SELECT {ADDRESS_COLUMNS} FROM gobble.address WHERE customer_id = $1 \
             ORDER BY is_default DESC, created_at, id"
        );
        let rows = sqlx::query_as::<_, AddressRow>(&sql)
            .bind(customer_id)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get one of the customer's addresses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        customer_id: CustomerId,
        id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let sql = format!(
            "SELECT {ADDRESS_COLUMNS} FROM gobble.address WHERE id = $1 AND customer_id = $2"
        );
        let row = sqlx::query_as::<_, AddressRow>(&sql)
            .bind(id)
            .bind(customer_id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Add an address. The first address, or one flagged default, becomes
    /// the default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        customer_id: CustomerId,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let has_any: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM gobble.address WHERE customer_id = $1)",
        )
        .bind(customer_id)
        .fetch_one(&mut *tx)
        .await?;
        let is_default = input.is_default || !has_any;

        if is_default {
            clear_default(&mut tx, customer_id).await?;
        }

        let sql = format!(
            r"
            INSERT INTO gobble.address
                (customer_id, label, street, city, postal_code, latitude, longitude, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ADDRESS_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, AddressRow>(&sql)
            .bind(customer_id)
            .bind(input.label.trim())
            .bind(input.street.trim())
            .bind(input.city.trim())
            .bind(input.postal_code.trim())
            .bind(input.location.latitude)
            .bind(input.location.longitude)
            .bind(is_default)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        row.try_into()
    }

    /// Replace one of the customer's addresses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer has no such address.
    pub async fn update(
        &self,
        customer_id: CustomerId,
        id: AddressId,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if input.is_default {
            clear_default(&mut tx, customer_id).await?;
        }

        let sql = format!(
            r"
            UPDATE gobble.address
            SET label = $3, street = $4, city = $5, postal_code = $6,
                latitude = $7, longitude = $8, is_default = is_default OR $9
            WHERE id = $1 AND customer_id = $2
            RETURNING {ADDRESS_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, AddressRow>(&sql)
            .bind(id)
            .bind(customer_id)
            .bind(input.label.trim())
            .bind(input.street.trim())
            .bind(input.city.trim())
            .bind(input.postal_code.trim())
            .bind(input.location.latitude)
            .bind(input.location.longitude)
            .bind(input.is_default)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        row.try_into()
    }

    /// Make an address the customer's default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer has no such address.
    pub async fn set_default(
        &self,
        customer_id: CustomerId,
        id: AddressId,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        clear_default(&mut tx, customer_id).await?;

        let sql = format!(
            r"
            UPDATE gobble.address SET is_default = true
            WHERE id = $1 AND customer_id = $2
            RETURNING {ADDRESS_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, AddressRow>(&sql)
            .bind(id)
            .bind(customer_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        row.try_into()
    }

    /// Delete one of the customer's addresses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer has no such address.
    pub async fn delete(&self, customer_id: CustomerId, id: AddressId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM gobble.address WHERE id = $1 AND customer_id = $2")
            .bind(id)
            .bind(customer_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

async fn clear_default(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    customer_id: CustomerId,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE gobble.address SET is_default = false WHERE customer_id = $1 AND is_default")
        .bind(customer_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
