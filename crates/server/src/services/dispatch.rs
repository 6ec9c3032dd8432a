//! Automatic courier assignment.
//!
//! Runs when an order becomes ready and when a courier comes online.
//! Assignment itself is a single conditional update, so a courier claiming an
//! order by hand and the dispatcher can race safely: whoever writes first
//! wins and the loser moves on.

use std::collections::HashMap;

use gobble_core::dispatch::nearest_courier;
use gobble_core::{CourierId, GeoPoint, NotificationKind, OrderId, RestaurantId};
use sqlx::PgPool;
use tracing::{debug, info, instrument};

use crate::db::{CourierRepository, OrderRepository, RepositoryError, RestaurantRepository};
use crate::models::Order;
use crate::services::notify::Notifier;

/// Assigns couriers to ready orders.
pub struct Dispatcher<'a> {
    pool: &'a PgPool,
    radius_km: f64,
}

impl<'a> Dispatcher<'a> {
    /// `radius_km` caps the courier-to-restaurant distance.
    #[must_use]
    pub const fn new(pool: &'a PgPool, radius_km: f64) -> Self {
        Self { pool, radius_km }
    }

    /// Hand `order` to the nearest free courier around its restaurant.
    ///
    /// Returns the updated order, or `None` if nobody was in range.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn dispatch_order(&self, order: &Order) -> Result<Option<Order>, RepositoryError> {
        if order.courier_id.is_some() || !order.status.is_dispatchable() {
            return Ok(None);
        }
        let Some(restaurant) = RestaurantRepository::new(self.pool)
            .get(order.restaurant_id)
            .await?
        else {
            return Ok(None);
        };

        let orders = OrderRepository::new(self.pool);
        let mut candidates = CourierRepository::new(self.pool)
            .dispatch_candidates()
            .await?;

        while let Some(choice) = nearest_courier(&restaurant.location, &candidates, self.radius_km) {
            if orders.assign_courier(order.id, choice.courier_id).await? {
                info!(
                    courier_id = %choice.courier_id,
                    distance_km = choice.distance_km,
                    "Courier assigned automatically"
                );
                return self.assigned(order.id).await;
            }
            // Either the order was taken or this courier just got busy.
            if orders
                .get(order.id)
                .await?
                .is_none_or(|o| o.courier_id.is_some())
            {
                return Ok(None);
            }
            candidates.retain(|c| c.id != choice.courier_id);
        }

        debug!("No courier in range");
        Ok(None)
    }

    /// Offer waiting ready orders to a courier who just came online, oldest
    /// order first. Does nothing if the courier cannot take a delivery right
    /// now (busy, unlocated, unapproved, or banned).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    #[instrument(skip(self), fields(courier_id = %courier_id))]
    pub async fn dispatch_to_courier(
        &self,
        courier_id: CourierId,
    ) -> Result<Option<Order>, RepositoryError> {
        let Some(courier) = CourierRepository::new(self.pool)
            .dispatch_candidates()
            .await?
            .into_iter()
            .find(|c| c.id == courier_id)
        else {
            debug!("Courier cannot take a delivery");
            return Ok(None);
        };

        let orders = OrderRepository::new(self.pool);
        let restaurants = RestaurantRepository::new(self.pool);
        let courier = [courier];
        let mut origins: HashMap<RestaurantId, Option<GeoPoint>> = HashMap::new();

        for order in orders.unassigned_ready().await? {
            let origin = match origins.get(&order.restaurant_id) {
                Some(origin) => *origin,
                None => {
                    let origin = restaurants
                        .get(order.restaurant_id)
                        .await?
                        .map(|r| r.location);
                    origins.insert(order.restaurant_id, origin);
                    origin
                }
            };
            let Some(origin) = origin else { continue };
            if nearest_courier(&origin, &courier, self.radius_km).is_none() {
                continue;
            }
            if orders.assign_courier(order.id, courier_id).await? {
                info!(order_id = %order.id, "Waiting order assigned to courier");
                return self.assigned(order.id).await;
            }
        }
        Ok(None)
    }

    async fn assigned(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = OrderRepository::new(self.pool).get(order_id).await?;
        if let Some(order) = &order {
            Notifier::new(self.pool)
                .order_event(order, NotificationKind::CourierAssigned)
                .await;
        }
        Ok(order)
    }
}
