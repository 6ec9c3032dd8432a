//! In-app notifications.
//!
//! Notifications are written after the change they describe has been
//! committed. A failed write is logged and never fails the request.

use gobble_core::{AccountRef, AccountRole, NotificationKind};
use sqlx::PgPool;
use tracing::warn;

use crate::db::NotificationRepository;
use crate::models::Order;

/// Writes notifications for order events, messages, and account changes.
pub struct Notifier<'a> {
    pool: &'a PgPool,
}

impl<'a> Notifier<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Notify everyone an order event concerns.
    pub async fn order_event(&self, order: &Order, kind: NotificationKind) {
        for (recipient, body) in order_recipients(order, kind) {
            self.send(recipient, kind, &body, Some(order)).await;
        }
    }

    /// Tell `recipient` a message arrived.
    pub async fn new_message(&self, recipient: AccountRef, subject: &str) {
        let body = format!("New message: {subject}");
        self.send(recipient, NotificationKind::NewMessage, &body, None)
            .await;
    }

    /// Tell an account its standing changed (approval, ban).
    pub async fn account_update(&self, recipient: AccountRef, body: &str) {
        self.send(recipient, NotificationKind::AccountUpdate, body, None)
            .await;
    }

    async fn send(
        &self,
        recipient: AccountRef,
        kind: NotificationKind,
        body: &str,
        order: Option<&Order>,
    ) {
        if let Err(e) = NotificationRepository::new(self.pool)
            .create(recipient, kind, body, order.map(|o| o.id))
            .await
        {
            warn!(error = %e, %recipient, ?kind, "Failed to write notification");
        }
    }
}

/// Who hears about an order event, and what they are told.
fn order_recipients(order: &Order, kind: NotificationKind) -> Vec<(AccountRef, String)> {
    let customer = AccountRef::new(AccountRole::Customer, order.customer_id.as_i32());
    let restaurant = AccountRef::new(AccountRole::Restaurant, order.restaurant_id.as_i32());
    let courier = order
        .courier_id
        .map(|id| AccountRef::new(AccountRole::Courier, id.as_i32()));
    let id = order.id;

    match kind {
        NotificationKind::OrderPlaced => vec![(
            restaurant,
            format!("New order #{id} ({} items, {})", order.items.len(), order.total),
        )],
        NotificationKind::OrderAccepted => vec![(
            customer,
            format!("{} accepted your order #{id}", order.restaurant_name),
        )],
        NotificationKind::OrderRejected => {
            let body = order.rejection_reason.as_deref().map_or_else(
                || format!("{} could not take your order #{id}", order.restaurant_name),
                |reason| {
                    format!(
                        "{} could not take your order #{id}: {reason}",
                        order.restaurant_name
                    )
                },
            );
            vec![(customer, body)]
        }
        NotificationKind::OrderReady => {
            vec![(customer, format!("Your order #{id} is ready for pickup"))]
        }
        NotificationKind::CourierAssigned => {
            let mut out = vec![(customer, format!("A courier is on the way for order #{id}"))];
            if let Some(courier) = courier {
                out.push((
                    courier,
                    format!(
                        "You have been assigned order #{id} from {}",
                        order.restaurant_name
                    ),
                ));
            }
            out
        }
        NotificationKind::OrderPickedUp => {
            vec![(customer, format!("Your order #{id} has been picked up"))]
        }
        NotificationKind::OrderDelivered => vec![
            (customer, format!("Your order #{id} has been delivered")),
            (restaurant, format!("Order #{id} was delivered")),
        ],
        NotificationKind::OrderCancelled => {
            vec![(restaurant, format!("Order #{id} was cancelled by the customer"))]
        }
        NotificationKind::NewMessage | NotificationKind::AccountUpdate => Vec::new(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use gobble_core::{CourierId, CustomerId, GeoPoint, Money, OrderId, OrderStatus, RestaurantId};
    use uuid::Uuid;

    use super::*;

    fn order() -> Order {
        Order {
            id: OrderId::new(7),
            customer_id: CustomerId::new(1),
            restaurant_id: RestaurantId::new(2),
            restaurant_name: "Pho Real".to_string(),
            courier_id: None,
            status: OrderStatus::Pending,
            idempotency_key: Uuid::new_v4(),
            delivery_address: "1 Main St, Springfield".to_string(),
            delivery_location: GeoPoint::new(45.0, -122.0).unwrap(),
            subtotal: Money::from_cents(2000),
            discount: Money::ZERO,
            delivery_fee: Money::from_cents(299),
            total: Money::from_cents(2299),
            promotion_id: None,
            coupon_id: None,
            note: None,
            rejection_reason: None,
            items: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_placed_goes_to_restaurant() {
        let out = order_recipients(&order(), NotificationKind::OrderPlaced);
        assert_eq!(out.len(), 1);
        let (recipient, body) = out.first().unwrap();
        assert_eq!(recipient.role, AccountRole::Restaurant);
        assert_eq!(recipient.id, 2);
        assert!(body.contains("#7"));
    }

    #[test]
    fn test_rejection_includes_reason() {
        let mut rejected = order();
        rejected.rejection_reason = Some("Kitchen closed".to_string());
        let out = order_recipients(&rejected, NotificationKind::OrderRejected);
        let (recipient, body) = out.first().unwrap();
        assert_eq!(recipient.role, AccountRole::Customer);
        assert!(body.ends_with("Kitchen closed"));
    }

    #[test]
    fn test_assignment_reaches_courier_when_known() {
        let unassigned = order_recipients(&order(), NotificationKind::CourierAssigned);
        assert_eq!(unassigned.len(), 1);

        let mut assigned = order();
        assigned.courier_id = Some(CourierId::new(9));
        let out = order_recipients(&assigned, NotificationKind::CourierAssigned);
        assert_eq!(out.len(), 2);
        assert!(out.iter().any(|(r, _)| r.role == AccountRole::Courier && r.id == 9));
    }

    #[test]
    fn test_account_kinds_are_not_order_events() {
        assert!(order_recipients(&order(), NotificationKind::AccountUpdate).is_empty());
    }
}
