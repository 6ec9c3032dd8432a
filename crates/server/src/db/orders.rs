//! Order database operations.
//!
//! Status changes are compare-and-set updates on the current status, so two
//! concurrent transitions of the same order cannot both succeed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use gobble_core::api::OrderListQuery;
use gobble_core::listing::Page;
use gobble_core::{
    CouponId, CourierId, CustomerId, MenuItemId, Money, OrderId, OrderStatus, PromotionId,
    RestaurantId,
};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{RepositoryError, count, geo_point, quantity};
use crate::models::{NewOrder, Order, OrderItem};

const ORDER_SELECT: &str = r"
    SELECT o.id, o.customer_id, o.restaurant_id, r.name AS restaurant_name, o.courier_id,
           o.status, o.idempotency_key, o.delivery_address, o.delivery_latitude,
           o.delivery_longitude, o.subtotal, o.discount, o.delivery_fee, o.total,
           o.promotion_id, o.coupon_id, o.note, o.rejection_reason, o.created_at, o.updated_at
    FROM gobble.customer_order o
    JOIN gobble.restaurant r ON r.id = o.restaurant_id";

/// Statuses in which an order occupies its courier.
const ACTIVE_DELIVERY_STATUSES: &str = "('accepted', 'ready', 'picked_up')";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    customer_id: CustomerId,
    restaurant_id: RestaurantId,
    restaurant_name: String,
    courier_id: Option<CourierId>,
    status: OrderStatus,
    idempotency_key: Uuid,
    delivery_address: String,
    delivery_latitude: f64,
    delivery_longitude: f64,
    subtotal: Money,
    discount: Money,
    delivery_fee: Money,
    total: Money,
    promotion_id: Option<PromotionId>,
    coupon_id: Option<CouponId>,
    note: Option<String>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        Ok(Order {
            id: self.id,
            customer_id: self.customer_id,
            restaurant_id: self.restaurant_id,
            restaurant_name: self.restaurant_name,
            courier_id: self.courier_id,
            status: self.status,
            idempotency_key: self.idempotency_key,
            delivery_address: self.delivery_address,
            delivery_location: geo_point(self.delivery_latitude, self.delivery_longitude)?,
            subtotal: self.subtotal,
            discount: self.discount,
            delivery_fee: self.delivery_fee,
            total: self.total,
            promotion_id: self.promotion_id,
            coupon_id: self.coupon_id,
            note: self.note,
            rejection_reason: self.rejection_reason,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: OrderId,
    menu_item_id: Option<MenuItemId>,
    name: String,
    unit_price: Money,
    quantity: i32,
}

/// Which orders a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    Customer(CustomerId),
    Restaurant(RestaurantId),
    Courier(CourierId),
    All,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("{ORDER_SELECT} WHERE o.id = $1");
        let Some(row) = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };

        let mut items = self.load_items(&[row.id]).await?;
        let order_items = items.remove(&row.id).unwrap_or_default();
        row.into_order(order_items).map(Some)
    }

    /// Orders visible in `scope`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        scope: OrderScope,
        query: &OrderListQuery,
    ) -> Result<Page<Order>, RepositoryError> {
        let page_request = query.page_request();

        let mut select: QueryBuilder<'_, Postgres> = QueryBuilder::new(ORDER_SELECT);
        push_order_filters(&mut select, scope, query.status);
        select.push(" ORDER BY o.created_at DESC, o.id DESC LIMIT ");
        select.push_bind(page_request.limit());
        select.push(" OFFSET ");
        select.push_bind(page_request.offset());
        let rows: Vec<OrderRow> = select.build_query_as().fetch_all(self.pool).await?;

        let mut total_query: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM gobble.customer_order o");
        push_order_filters(&mut total_query, scope, query.status);
        let total: i64 = total_query.build_query_scalar().fetch_one(self.pool).await?;

        let orders = self.attach_items(rows).await?;
        Ok(Page::new(orders, page_request, count(total)))
    }

    /// Orders without a courier that a courier may still take, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn open_deliveries(&self) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "{ORDER_SELECT} WHERE o.courier_id IS NULL AND o.status IN ('accepted', 'ready') \
             ORDER BY o.created_at, o.id"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        self.attach_items(rows).await
    }

    /// Ready orders still waiting for a courier.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn unassigned_ready(&self) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "{ORDER_SELECT} WHERE o.courier_id IS NULL AND o.status = 'ready' \
             ORDER BY o.created_at, o.id"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        self.attach_items(rows).await
    }

    /// Like [`transition_in`], but only for the assigned courier.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn courier_transition(
        &self,
        id: OrderId,
        courier_id: CourierId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE gobble.customer_order
            SET status = $4, updated_at = now()
            WHERE id = $1 AND courier_id = $2 AND status = $3
            ",
        )
        .bind(id)
        .bind(courier_id)
        .bind(from)
        .bind(to)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Give an unassigned, dispatchable order to `courier_id`, provided the
    /// courier is not already carrying another order. First caller wins.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn assign_courier(
        &self,
        id: OrderId,
        courier_id: CourierId,
    ) -> Result<bool, RepositoryError> {
        let sql = format!(
            r"
            UPDATE gobble.customer_order
            SET courier_id = $2, updated_at = now()
            WHERE id = $1
              AND courier_id IS NULL
              AND status IN ('accepted', 'ready')
              AND NOT EXISTS (
                  SELECT 1 FROM gobble.customer_order busy
                  WHERE busy.courier_id = $2 AND busy.status IN {ACTIVE_DELIVERY_STATUSES}
              )
            "
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(courier_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn attach_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        let ids: Vec<OrderId> = rows.iter().map(|r| r.id).collect();
        let mut items = self.load_items(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let order_items = items.remove(&row.id).unwrap_or_default();
                row.into_order(order_items)
            })
            .collect()
    }

    async fn load_items(
        &self,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderItem>>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let raw_ids: Vec<i32> = order_ids.iter().map(OrderId::as_i32).collect();
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT order_id, menu_item_id, name, unit_price, quantity
            FROM gobble.order_item
            WHERE order_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(raw_ids)
        .fetch_all(self.pool)
        .await?;

        let mut grouped: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            grouped.entry(row.order_id).or_default().push(OrderItem {
                menu_item_id: row.menu_item_id,
                name: row.name,
                unit_price: row.unit_price,
                quantity: quantity(row.quantity)?,
            });
        }
        Ok(grouped)
    }
}

// =============================================================================
// Transactional helpers
// =============================================================================

/// Move an order from `from` to `to`. Returns `false` if the order is no
/// longer in `from`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn transition_in(
    conn: &mut PgConnection,
    id: OrderId,
    from: OrderStatus,
    to: OrderStatus,
    rejection_reason: Option<&str>,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE gobble.customer_order
        SET status = $3,
            rejection_reason = COALESCE($4, rejection_reason),
            updated_at = now()
        WHERE id = $1 AND status = $2
        ",
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(rejection_reason)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// ID of the order a customer already placed with `idempotency_key`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_by_idempotency_key_in(
    conn: &mut PgConnection,
    customer_id: CustomerId,
    idempotency_key: Uuid,
) -> Result<Option<OrderId>, RepositoryError> {
    let id = sqlx::query_scalar(
        "SELECT id FROM gobble.customer_order WHERE customer_id = $1 AND idempotency_key = $2",
    )
    .bind(customer_id)
    .bind(idempotency_key)
    .fetch_optional(conn)
    .await?;

    Ok(id)
}

/// Insert an order and its items.
///
/// Returns `None` when an order with the same idempotency key already exists.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if an insert fails.
pub async fn insert_in(
    conn: &mut PgConnection,
    order: &NewOrder,
) -> Result<Option<OrderId>, RepositoryError> {
    let id: Option<OrderId> = sqlx::query_scalar(
        r"
        INSERT INTO gobble.customer_order
            (customer_id, restaurant_id, idempotency_key, delivery_address,
             delivery_latitude, delivery_longitude, subtotal, discount, delivery_fee, total,
             promotion_id, coupon_id, note)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ON CONFLICT (customer_id, idempotency_key) DO NOTHING
        RETURNING id
        ",
    )
    .bind(order.customer_id)
    .bind(order.restaurant_id)
    .bind(order.idempotency_key)
    .bind(&order.delivery_address)
    .bind(order.delivery_location.latitude)
    .bind(order.delivery_location.longitude)
    .bind(order.subtotal)
    .bind(order.discount)
    .bind(order.delivery_fee)
    .bind(order.total)
    .bind(order.promotion_id)
    .bind(order.coupon_id)
    .bind(order.note.as_deref())
    .fetch_optional(&mut *conn)
    .await?;

    let Some(order_id) = id else {
        return Ok(None);
    };
    if order.items.is_empty() {
        return Ok(Some(order_id));
    }

    let mut items: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "INSERT INTO gobble.order_item (order_id, menu_item_id, name, unit_price, quantity) ",
    );
    items.push_values(&order.items, |mut b, item| {
        b.push_bind(order_id)
            .push_bind(item.menu_item_id)
            .push_bind(&item.name)
            .push_bind(item.unit_price)
            .push_bind(i32::try_from(item.quantity).unwrap_or(i32::MAX));
    });
    items.build().execute(&mut *conn).await?;

    Ok(Some(order_id))
}

fn push_order_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    scope: OrderScope,
    status: Option<OrderStatus>,
) {
    builder.push(" WHERE TRUE");
    match scope {
        OrderScope::Customer(id) => {
            builder.push(" AND o.customer_id = ");
            builder.push_bind(id);
        }
        OrderScope::Restaurant(id) => {
            builder.push(" AND o.restaurant_id = ");
            builder.push_bind(id);
        }
        OrderScope::Courier(id) => {
            builder.push(" AND o.courier_id = ");
            builder.push_bind(id);
        }
        OrderScope::All => {}
    }
    if let Some(status) = status {
        builder.push(" AND o.status = ");
        builder.push_bind(status);
    }
}
