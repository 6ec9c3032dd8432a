//! Messages between accounts and notifications.

use chrono::{DateTime, Utc};
use gobble_core::api::{MessageView, NotificationView};
use gobble_core::{AccountRef, MessageId, NotificationId, NotificationKind, OrderId};

#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub sender: AccountRef,
    pub recipient: AccountRef,
    pub subject: String,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Message> for MessageView {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id,
            sender: m.sender,
            recipient: m.recipient,
            subject: m.subject.clone(),
            body: m.body.clone(),
            read_at: m.read_at,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: AccountRef,
    pub kind: NotificationKind,
    pub body: String,
    pub order_id: Option<OrderId>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Notification> for NotificationView {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id,
            kind: n.kind,
            body: n.body.clone(),
            order_id: n.order_id,
            read_at: n.read_at,
            created_at: n.created_at,
        }
    }
}
