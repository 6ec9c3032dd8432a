//! Bearer token storage.
//!
//! Only the HMAC digest of a token is stored; the raw token never reaches the
//! database.

use chrono::{DateTime, Utc};
use gobble_core::{AccountRef, AccountRole};
use sqlx::PgPool;

use super::RepositoryError;

/// A live token row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TokenRecord {
    pub id: i64,
    pub role: AccountRole,
    pub account_id: i32,
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    #[must_use]
    pub const fn account(&self) -> AccountRef {
        AccountRef::new(self.role, self.account_id)
    }
}

/// Repository for bearer tokens.
pub struct TokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TokenRepository<'a> {
    /// Create a new token repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a token digest for `account`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        token_hash: &str,
        account: AccountRef,
        expires_at: DateTime<Utc>,
    ) -> Result<TokenRecord, RepositoryError> {
        let record = sqlx::query_as::<_, TokenRecord>(
            r"
            INSERT INTO gobble.auth_token (token_hash, role, account_id, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, role, account_id, expires_at
            ",
        )
        .bind(token_hash)
        .bind(account.role)
        .bind(account.id)
        .bind(expires_at)
        .fetch_one(self.pool)
        .await?;

        Ok(record)
    }

    /// Look up an unexpired token and touch its `last_seen_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn resolve(&self, token_hash: &str) -> Result<Option<TokenRecord>, RepositoryError> {
        let record = sqlx::query_as::<_, TokenRecord>(
            r"
            UPDATE gobble.auth_token
            SET last_seen_at = now()
            WHERE token_hash = $1 AND expires_at > now()
            RETURNING id, role, account_id, expires_at
            ",
        )
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// Delete one token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn revoke(&self, id: i64) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM gobble.auth_token WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Delete every token of `account`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn revoke_all_for(&self, account: AccountRef) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM gobble.auth_token WHERE role = $1 AND account_id = $2")
                .bind(account.role)
                .bind(account.id)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Remove expired tokens.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM gobble.auth_token WHERE expires_at <= now()")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
