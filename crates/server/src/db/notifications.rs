//! Notification database operations.

use chrono::{DateTime, Utc};
use gobble_core::listing::{Page, PageRequest};
use gobble_core::{AccountRef, AccountRole, NotificationId, NotificationKind, OrderId};
use sqlx::PgPool;

use super::{RepositoryError, count};
use crate::models::Notification;

const NOTIFICATION_COLUMNS: &str =
    "id, recipient_role, recipient_id, kind, body, order_id, read_at, created_at";

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: NotificationId,
    recipient_role: AccountRole,
    recipient_id: i32,
    kind: NotificationKind,
    body: String,
    order_id: Option<OrderId>,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            recipient: AccountRef::new(row.recipient_role, row.recipient_id),
            kind: row.kind,
            body: row.body,
            order_id: row.order_id,
            read_at: row.read_at,
            created_at: row.created_at,
        }
    }
}

/// Repository for notifications.
pub struct NotificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepository<'a> {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a notification.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        recipient: AccountRef,
        kind: NotificationKind,
        body: &str,
        order_id: Option<OrderId>,
    ) -> Result<Notification, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO gobble.notification (recipient_role, recipient_id, kind, body, order_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {NOTIFICATION_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(recipient.role)
            .bind(recipient.id)
            .bind(kind)
            .bind(body)
            .bind(order_id)
            .fetch_one(self.pool)
            .await?;

        Ok(row.into())
    }

    /// Notifications of `recipient`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        recipient: AccountRef,
        page_request: PageRequest,
    ) -> Result<Page<Notification>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {NOTIFICATION_COLUMNS}
            FROM gobble.notification
            WHERE recipient_role = $1 AND recipient_id = $2
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "
        );
        let rows = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(recipient.role)
            .bind(recipient.id)
            .bind(page_request.limit())
            .bind(page_request.offset())
            .fetch_all(self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM gobble.notification WHERE recipient_role = $1 AND recipient_id = $2",
        )
        .bind(recipient.role)
        .bind(recipient.id)
        .fetch_one(self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Into::into).collect(),
            page_request,
            count(total),
        ))
    }

    /// Unread notifications and messages of `recipient`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unread_count(&self, recipient: AccountRef) -> Result<i64, RepositoryError> {
        let unread: i64 = sqlx::query_scalar(
            r"
            SELECT
                (SELECT COUNT(*) FROM gobble.notification
                 WHERE recipient_role = $1 AND recipient_id = $2 AND read_at IS NULL)
              + (SELECT COUNT(*) FROM gobble.message
                 WHERE recipient_role = $1 AND recipient_id = $2 AND read_at IS NULL)
            ",
        )
        .bind(recipient.role)
        .bind(recipient.id)
        .fetch_one(self.pool)
        .await?;

        Ok(unread)
    }

    /// Mark one notification as read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if `recipient` has no such notification.
    pub async fn mark_read(
        &self,
        recipient: AccountRef,
        id: NotificationId,
    ) -> Result<Notification, RepositoryError> {
        let sql = format!(
            r"
            UPDATE gobble.notification
            SET read_at = COALESCE(read_at, now())
            WHERE id = $1 AND recipient_role = $2 AND recipient_id = $3
            RETURNING {NOTIFICATION_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(id)
            .bind(recipient.role)
            .bind(recipient.id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Mark every unread notification of `recipient` as read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_all_read(&self, recipient: AccountRef) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE gobble.notification
            SET read_at = now()
            WHERE recipient_role = $1 AND recipient_id = $2 AND read_at IS NULL
            ",
        )
        .bind(recipient.role)
        .bind(recipient.id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
