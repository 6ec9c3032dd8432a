//! Orders and their line items.

use chrono::{DateTime, Utc};
use gobble_core::api::{OrderItemView, OrderView};
use gobble_core::{
    CouponId, CourierId, CustomerId, GeoPoint, MenuItemId, Money, OrderId, OrderStatus,
    PromotionId, RestaurantId,
};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct OrderItem {
    pub menu_item_id: Option<MenuItemId>,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub restaurant_id: RestaurantId,
    pub restaurant_name: String,
    pub courier_id: Option<CourierId>,
    pub status: OrderStatus,
    pub idempotency_key: Uuid,
    pub delivery_address: String,
    pub delivery_location: GeoPoint,
    pub subtotal: Money,
    pub discount: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub promotion_id: Option<PromotionId>,
    pub coupon_id: Option<CouponId>,
    pub note: Option<String>,
    pub rejection_reason: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderView {
    fn from(o: &Order) -> Self {
        Self {
            id: o.id,
            customer_id: o.customer_id,
            restaurant_id: o.restaurant_id,
            restaurant_name: o.restaurant_name.clone(),
            courier_id: o.courier_id,
            status: o.status,
            delivery_address: o.delivery_address.clone(),
            delivery_location: o.delivery_location,
            subtotal: o.subtotal,
            discount: o.discount,
            delivery_fee: o.delivery_fee,
            total: o.total,
            promotion_id: o.promotion_id,
            coupon_id: o.coupon_id,
            note: o.note.clone(),
            rejection_reason: o.rejection_reason.clone(),
            items: o
                .items
                .iter()
                .map(|i| OrderItemView {
                    menu_item_id: i.menu_item_id,
                    name: i.name.clone(),
                    unit_price: i.unit_price,
                    quantity: i.quantity,
                })
                .collect(),
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

/// Everything needed to insert an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub restaurant_id: RestaurantId,
    pub idempotency_key: Uuid,
    pub delivery_address: String,
    pub delivery_location: GeoPoint,
    pub subtotal: Money,
    pub discount: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub promotion_id: Option<PromotionId>,
    pub coupon_id: Option<CouponId>,
    pub note: Option<String>,
    pub items: Vec<OrderItem>,
}
