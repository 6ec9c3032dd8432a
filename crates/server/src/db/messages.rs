//! Message database operations.

use chrono::{DateTime, Utc};
use gobble_core::listing::{Page, PageRequest};
use gobble_core::{AccountRef, AccountRole, MessageId};
use sqlx::PgPool;

use super::{RepositoryError, count};
use crate::models::Message;

const MESSAGE_COLUMNS: &str =
    "id, sender_role, sender_id, recipient_role, recipient_id, subject, body, read_at, created_at";

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: MessageId,
    sender_role: AccountRole,
    sender_id: i32,
    recipient_role: AccountRole,
    recipient_id: i32,
    subject: String,
    body: String,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            sender: AccountRef::new(row.sender_role, row.sender_id),
            recipient: AccountRef::new(row.recipient_role, row.recipient_id),
            subject: row.subject,
            body: row.body,
            read_at: row.read_at,
            created_at: row.created_at,
        }
    }
}

/// Which side of a conversation to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mailbox {
    Inbox,
    Sent,
}

impl Mailbox {
    const fn columns(self) -> (&'static str, &'static str) {
        match self {
            Self::Inbox => ("recipient_role", "recipient_id"),
            Self::Sent => ("sender_role", "sender_id"),
        }
    }
}

/// Repository for messages between accounts.
pub struct MessageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MessageRepository<'a> {
    /// Create a new message repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        sender: AccountRef,
        recipient: AccountRef,
        subject: &str,
        body: &str,
    ) -> Result<Message, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO gobble.message (sender_role, sender_id, recipient_role, recipient_id, subject, body)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {MESSAGE_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(sender.role)
            .bind(sender.id)
            .bind(recipient.role)
            .bind(recipient.id)
            .bind(subject)
            .bind(body)
            .fetch_one(self.pool)
            .await?;

        Ok(row.into())
    }

    /// Messages received or sent by `account`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        account: AccountRef,
        mailbox: Mailbox,
        page_request: PageRequest,
    ) -> Result<Page<Message>, RepositoryError> {
        let (role_col, id_col) = mailbox.columns();
        let sql = format!(
            r"
            SELECT {MESSAGE_COLUMNS}
            FROM gobble.message
            WHERE {role_col} = $1 AND {id_col} = $2
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "
        );
        let rows = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(account.role)
            .bind(account.id)
            .bind(page_request.limit())
            .bind(page_request.offset())
            .fetch_all(self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM gobble.message WHERE {role_col} = $1 AND {id_col} = $2"
        ))
        .bind(account.role)
        .bind(account.id)
        .fetch_one(self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Into::into).collect(),
            page_request,
            count(total),
        ))
    }

    /// Mark a received message as read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if `recipient` has no such message.
    pub async fn mark_read(
        &self,
        recipient: AccountRef,
        id: MessageId,
    ) -> Result<Message, RepositoryError> {
        let sql = format!(
            r"
            UPDATE gobble.message
            SET read_at = COALESCE(read_at, now())
            WHERE id = $1 AND recipient_role = $2 AND recipient_id = $3
            RETURNING {MESSAGE_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(id)
            .bind(recipient.role)
            .bind(recipient.id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }
}
