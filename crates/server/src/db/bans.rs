//! Ban database operations.

use chrono::{DateTime, Utc};
use gobble_core::api::BanListQuery;
use gobble_core::listing::Page;
use gobble_core::moderation::Ban;
use gobble_core::{AccountRef, AccountRole, AdminUserId, BanId};
use sqlx::PgPool;

use super::{RepositoryError, count};

/// Predicate over a `gobble.ban` row aliased `b` that is in force now.
pub const ACTIVE_BAN_SQL: &str =
    "b.lifted_at IS NULL AND b.starts_at <= now() AND (b.ends_at IS NULL OR b.ends_at > now())";

const BAN_COLUMNS: &str =
    "b.id, b.target_role, b.target_id, b.reason, b.starts_at, b.ends_at, b.lifted_at, b.issued_by";

#[derive(Debug, sqlx::FromRow)]
struct BanRow {
    id: i32,
    target_role: AccountRole,
    target_id: i32,
    reason: String,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
    lifted_at: Option<DateTime<Utc>>,
    issued_by: i32,
}

impl From<BanRow> for Ban {
    fn from(row: BanRow) -> Self {
        Self {
            id: BanId::new(row.id),
            target: AccountRef::new(row.target_role, row.target_id),
            reason: row.reason,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            lifted_at: row.lifted_at,
            issued_by: AdminUserId::new(row.issued_by),
        }
    }
}

/// Repository for bans.
pub struct BanRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BanRepository<'a> {
    /// Create a new ban repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a ban.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        target: AccountRef,
        reason: &str,
        starts_at: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
        issued_by: AdminUserId,
    ) -> Result<Ban, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO gobble.ban AS b (target_role, target_id, reason, starts_at, ends_at, issued_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {BAN_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, BanRow>(&sql)
            .bind(target.role)
            .bind(target.id)
            .bind(reason)
            .bind(starts_at)
            .bind(ends_at)
            .bind(issued_by)
            .fetch_one(self.pool)
            .await?;

        Ok(row.into())
    }

    /// Lift a ban that has not been lifted yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no unlifted ban has this ID.
    pub async fn lift(&self, id: BanId) -> Result<Ban, RepositoryError> {
        let sql = format!(
            r"
            UPDATE gobble.ban AS b
            SET lifted_at = now()
            WHERE b.id = $1 AND b.lifted_at IS NULL
            RETURNING {BAN_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, BanRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// The active ban on `target` that ends last, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_for(&self, target: AccountRef) -> Result<Option<Ban>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {BAN_COLUMNS}
            FROM gobble.ban b
            WHERE b.target_role = $1 AND b.target_id = $2 AND {ACTIVE_BAN_SQL}
            ORDER BY b.ends_at DESC NULLS FIRST
            LIMIT 1
            "
        );
        let row = sqlx::query_as::<_, BanRow>(&sql)
            .bind(target.role)
            .bind(target.id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Bans, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, query: &BanListQuery) -> Result<Page<Ban>, RepositoryError> {
        let page_request = query.page_request();
        let filter = if query.active_only {
            ACTIVE_BAN_SQL
        } else {
            "TRUE"
        };

        let sql = format!(
            r"
            SELECT {BAN_COLUMNS}
            FROM gobble.ban b
            WHERE {filter}
            ORDER BY b.starts_at DESC, b.id DESC
            LIMIT $1 OFFSET $2
            "
        );
        let rows = sqlx::query_as::<_, BanRow>(&sql)
            .bind(page_request.limit())
            .bind(page_request.offset())
            .fetch_all(self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM gobble.ban b WHERE {filter}"))
            .fetch_one(self.pool)
            .await?;

        Ok(Page::new(
            rows.into_iter().map(Into::into).collect(),
            page_request,
            count(total),
        ))
    }
}
