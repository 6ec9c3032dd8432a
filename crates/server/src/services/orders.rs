//! Order lifecycle.
//!
//! Every status change checks `OrderStatus::can_transition_to` first and then
//! writes with a compare-and-set on the status it read. Losing that race is a
//! conflict, not a silent overwrite. Rejecting or cancelling an order gives
//! its coupon use back in the same transaction.

use gobble_core::api::OrderListQuery;
use gobble_core::listing::Page;
use gobble_core::{
    AccountRole, CourierId, CustomerId, NotificationKind, OrderId, OrderStatus, RestaurantId,
};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::ServerConfig;
use crate::db::orders::OrderScope;
use crate::db::{OrderRepository, RepositoryError, coupons, orders};
use crate::models::{Order, Principal};
use crate::services::dispatch::Dispatcher;
use crate::services::notify::Notifier;

/// Longest rejection reason kept on an order.
const MAX_REASON_LENGTH: usize = 500;

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderServiceError {
    /// Unknown order, or one the caller may not see.
    #[error("order not found")]
    NotFound,

    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The order changed underneath the caller.
    #[error("{0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Order lifecycle service.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    config: &'a ServerConfig,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, config: &'a ServerConfig) -> Self {
        Self { pool, config }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// An order the principal is allowed to see.
    ///
    /// Customers and restaurants see their own orders, couriers see orders
    /// assigned to them and unassigned open deliveries, admins see everything.
    ///
    /// # Errors
    ///
    /// Returns `OrderServiceError::NotFound` otherwise.
    pub async fn get_for(
        &self,
        principal: &Principal,
        id: OrderId,
    ) -> Result<Order, OrderServiceError> {
        let order = self.load(id).await?;
        if can_view(principal, &order) {
            Ok(order)
        } else {
            Err(OrderServiceError::NotFound)
        }
    }

    /// Orders of the principal, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderServiceError::Repository` if the query fails.
    pub async fn list_for(
        &self,
        principal: &Principal,
        query: &OrderListQuery,
    ) -> Result<Page<Order>, OrderServiceError> {
        let scope = match principal.role() {
            AccountRole::Customer => OrderScope::Customer(principal.customer_id()),
            AccountRole::Restaurant => OrderScope::Restaurant(principal.restaurant_id()),
            AccountRole::Courier => OrderScope::Courier(principal.courier_id()),
            AccountRole::Admin => OrderScope::All,
        };
        Ok(OrderRepository::new(self.pool).list(scope, query).await?)
    }

    /// Orders a courier may claim.
    ///
    /// # Errors
    ///
    /// Returns `OrderServiceError::Repository` if the query fails.
    pub async fn open_deliveries(&self) -> Result<Vec<Order>, OrderServiceError> {
        Ok(OrderRepository::new(self.pool).open_deliveries().await?)
    }

    // =========================================================================
    // Customer
    // =========================================================================

    /// Cancel a pending order.
    ///
    /// # Errors
    ///
    /// Returns `OrderServiceError::InvalidTransition` once the restaurant has
    /// responded.
    #[instrument(skip(self), fields(customer_id = %customer_id, order_id = %id))]
    pub async fn cancel(
        &self,
        customer_id: CustomerId,
        id: OrderId,
    ) -> Result<Order, OrderServiceError> {
        let order = self.load(id).await?;
        if order.customer_id != customer_id {
            return Err(OrderServiceError::NotFound);
        }
        let order = self.transition(order, OrderStatus::Cancelled, None).await?;
        self.notify(&order, NotificationKind::OrderCancelled).await;
        Ok(order)
    }

    // =========================================================================
    // Restaurant
    // =========================================================================

    /// Accept a pending order.
    ///
    /// # Errors
    ///
    /// Returns `OrderServiceError::NotFound` for other restaurants' orders and
    /// `OrderServiceError::InvalidTransition` unless the order is pending.
    #[instrument(skip(self), fields(restaurant_id = %restaurant_id, order_id = %id))]
    pub async fn accept(
        &self,
        restaurant_id: RestaurantId,
        id: OrderId,
    ) -> Result<Order, OrderServiceError> {
        let order = self.load_for_restaurant(restaurant_id, id).await?;
        let order = self.transition(order, OrderStatus::Accepted, None).await?;
        self.notify(&order, NotificationKind::OrderAccepted).await;
        Ok(order)
    }

    /// Reject a pending order, optionally saying why.
    ///
    /// # Errors
    ///
    /// Same as [`Self::accept`], plus `OrderServiceError::InvalidInput` for an
    /// overlong reason.
    #[instrument(skip(self, reason), fields(restaurant_id = %restaurant_id, order_id = %id))]
    pub async fn reject(
        &self,
        restaurant_id: RestaurantId,
        id: OrderId,
        reason: Option<&str>,
    ) -> Result<Order, OrderServiceError> {
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        if reason.is_some_and(|r| r.chars().count() > MAX_REASON_LENGTH) {
            return Err(OrderServiceError::InvalidInput(format!(
                "reason cannot exceed {MAX_REASON_LENGTH} characters"
            )));
        }

        let order = self.load_for_restaurant(restaurant_id, id).await?;
        let order = self.transition(order, OrderStatus::Rejected, reason).await?;
        self.notify(&order, NotificationKind::OrderRejected).await;
        Ok(order)
    }

    /// Mark an accepted order ready and try to dispatch a courier.
    ///
    /// Dispatch failures are logged; the order stays ready and open for
    /// couriers to claim.
    ///
    /// # Errors
    ///
    /// Same as [`Self::accept`].
    #[instrument(skip(self), fields(restaurant_id = %restaurant_id, order_id = %id))]
    pub async fn mark_ready(
        &self,
        restaurant_id: RestaurantId,
        id: OrderId,
    ) -> Result<Order, OrderServiceError> {
        let order = self.load_for_restaurant(restaurant_id, id).await?;
        let order = self.transition(order, OrderStatus::Ready, None).await?;
        self.notify(&order, NotificationKind::OrderReady).await;

        if order.courier_id.is_some() {
            return Ok(order);
        }
        match Dispatcher::new(self.pool, self.config.dispatch_radius_km)
            .dispatch_order(&order)
            .await
        {
            Ok(Some(assigned)) => Ok(assigned),
            Ok(None) => Ok(order),
            Err(e) => {
                warn!(error = %e, "Automatic dispatch failed");
                Ok(order)
            }
        }
    }

    // =========================================================================
    // Courier
    // =========================================================================

    /// Claim an open delivery. First claim wins.
    ///
    /// # Errors
    ///
    /// Returns `OrderServiceError::Conflict` if the order is taken or the
    /// courier already has an active delivery.
    #[instrument(skip(self), fields(courier_id = %courier_id, order_id = %id))]
    pub async fn claim(
        &self,
        courier_id: CourierId,
        id: OrderId,
    ) -> Result<Order, OrderServiceError> {
        let order = self.load(id).await?;
        if order.courier_id == Some(courier_id) {
            return Ok(order);
        }
        if order.courier_id.is_some() || !order.status.is_dispatchable() {
            return Err(OrderServiceError::Conflict(
                "order is no longer open for delivery".to_owned(),
            ));
        }

        if !OrderRepository::new(self.pool)
            .assign_courier(id, courier_id)
            .await?
        {
            return Err(OrderServiceError::Conflict(
                "order was taken, or you already have an active delivery".to_owned(),
            ));
        }

        let order = self.load(id).await?;
        info!("Delivery claimed");
        self.notify(&order, NotificationKind::CourierAssigned).await;
        Ok(order)
    }

    /// Pick up a ready order.
    ///
    /// # Errors
    ///
    /// Returns `OrderServiceError::NotFound` unless the order is assigned to
    /// the courier, and `OrderServiceError::InvalidTransition` unless ready.
    #[instrument(skip(self), fields(courier_id = %courier_id, order_id = %id))]
    pub async fn pick_up(
        &self,
        courier_id: CourierId,
        id: OrderId,
    ) -> Result<Order, OrderServiceError> {
        let order = self
            .courier_transition(courier_id, id, OrderStatus::PickedUp)
            .await?;
        self.notify(&order, NotificationKind::OrderPickedUp).await;
        Ok(order)
    }

    /// Mark a picked-up order delivered.
    ///
    /// # Errors
    ///
    /// Same as [`Self::pick_up`].
    #[instrument(skip(self), fields(courier_id = %courier_id, order_id = %id))]
    pub async fn deliver(
        &self,
        courier_id: CourierId,
        id: OrderId,
    ) -> Result<Order, OrderServiceError> {
        let order = self
            .courier_transition(courier_id, id, OrderStatus::Delivered)
            .await?;
        self.notify(&order, NotificationKind::OrderDelivered).await;
        Ok(order)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn load(&self, id: OrderId) -> Result<Order, OrderServiceError> {
        OrderRepository::new(self.pool)
            .get(id)
            .await?
            .ok_or(OrderServiceError::NotFound)
    }

    async fn load_for_restaurant(
        &self,
        restaurant_id: RestaurantId,
        id: OrderId,
    ) -> Result<Order, OrderServiceError> {
        let order = self.load(id).await?;
        if order.restaurant_id == restaurant_id {
            Ok(order)
        } else {
            Err(OrderServiceError::NotFound)
        }
    }

    async fn transition(
        &self,
        order: Order,
        to: OrderStatus,
        rejection_reason: Option<&str>,
    ) -> Result<Order, OrderServiceError> {
        check_transition(order.status, to)?;
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        if !orders::transition_in(&mut *tx, order.id, order.status, to, rejection_reason).await? {
            return Err(stale(order.id));
        }
        if to.is_void()
            && let Some(coupon_id) = order.coupon_id
        {
            coupons::release_in(&mut *tx, coupon_id).await?;
        }
        tx.commit().await.map_err(RepositoryError::from)?;
        info!(order_id = %order.id, from = %order.status, %to, "Order status changed");
        self.load(order.id).await
    }

    async fn courier_transition(
        &self,
        courier_id: CourierId,
        id: OrderId,
        to: OrderStatus,
    ) -> Result<Order, OrderServiceError> {
        let order = self.load(id).await?;
        if order.courier_id != Some(courier_id) {
            return Err(OrderServiceError::NotFound);
        }
        check_transition(order.status, to)?;
        if !OrderRepository::new(self.pool)
            .courier_transition(id, courier_id, order.status, to)
            .await?
        {
            return Err(stale(id));
        }
        info!(order_id = %id, from = %order.status, %to, "Order status changed");
        self.load(id).await
    }

    async fn notify(&self, order: &Order, kind: NotificationKind) {
        Notifier::new(self.pool).order_event(order, kind).await;
    }
}

fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderServiceError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(OrderServiceError::InvalidTransition { from, to })
    }
}

fn stale(id: OrderId) -> OrderServiceError {
    OrderServiceError::Conflict(format!("order {id} changed; reload and try again"))
}

fn can_view(principal: &Principal, order: &Order) -> bool {
    match principal.role() {
        AccountRole::Customer => order.customer_id == principal.customer_id(),
        AccountRole::Restaurant => order.restaurant_id == principal.restaurant_id(),
        AccountRole::Courier => match order.courier_id {
            Some(courier) => courier == principal.courier_id(),
            None => order.status.is_dispatchable(),
        },
        AccountRole::Admin => true,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use gobble_core::{AccountRef, GeoPoint, Money};
    use uuid::Uuid;

    use super::*;

    fn order(status: OrderStatus, courier: Option<i32>) -> Order {
        Order {
            id: OrderId::new(1),
            customer_id: CustomerId::new(10),
            restaurant_id: RestaurantId::new(20),
            restaurant_name: "Pho Real".to_string(),
            courier_id: courier.map(CourierId::new),
            status,
            idempotency_key: Uuid::new_v4(),
            delivery_address: "1 Main St".to_string(),
            delivery_location: GeoPoint::new(45.0, -122.0).unwrap(),
            subtotal: Money::from_cents(1000),
            discount: Money::ZERO,
            delivery_fee: Money::ZERO,
            total: Money::from_cents(1000),
            promotion_id: None,
            coupon_id: None,
            note: None,
            rejection_reason: None,
            items: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn principal(role: AccountRole, id: i32) -> Principal {
        Principal {
            token_id: 1,
            account: AccountRef::new(role, id),
            name: "Someone".to_string(),
            email: "someone@example.com".to_string(),
            approval_status: None,
            admin_role: None,
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn test_owners_can_view() {
        let o = order(OrderStatus::Pending, None);
        assert!(can_view(&principal(AccountRole::Customer, 10), &o));
        assert!(!can_view(&principal(AccountRole::Customer, 11), &o));
        assert!(can_view(&principal(AccountRole::Restaurant, 20), &o));
        assert!(!can_view(&principal(AccountRole::Restaurant, 21), &o));
        assert!(can_view(&principal(AccountRole::Admin, 1), &o));
    }

    #[test]
    fn test_courier_visibility() {
        let courier = principal(AccountRole::Courier, 5);
        assert!(!can_view(&courier, &order(OrderStatus::Pending, None)));
        assert!(can_view(&courier, &order(OrderStatus::Ready, None)));
        assert!(can_view(&courier, &order(OrderStatus::Delivered, Some(5))));
        assert!(!can_view(&courier, &order(OrderStatus::Ready, Some(6))));
    }

    #[test]
    fn test_transition_check() {
        assert!(check_transition(OrderStatus::Pending, OrderStatus::Cancelled).is_ok());
        assert!(matches!(
            check_transition(OrderStatus::Accepted, OrderStatus::Cancelled),
            Err(OrderServiceError::InvalidTransition { .. })
        ));
        assert!(check_transition(OrderStatus::Delivered, OrderStatus::Ready).is_err());
    }
}
