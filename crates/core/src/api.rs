//! Request and response bodies for the HTTP API.
//!
//! Shared by `gobble-server` (which produces them) and `gobble-client` (which
//! consumes them) so the two cannot drift apart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::{Cart, CartRestaurant, PriceChange};
use crate::listing::{PageRequest, SortDirection};
use crate::pricing::{DiscountSelection, OrderTotals};
use crate::types::{
    AccountRef, AccountRole, AddressId, AdminRole, AdminUserId, ApprovalStatus, CouponId,
    CourierId, CustomerId, GeoPoint, MenuItemId, MessageId, Money, NotificationId,
    NotificationKind, OrderId, OrderStatus, PromotionId, RestaurantId,
};

// =============================================================================
// Errors
// =============================================================================

/// JSON body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable machine-readable code, e.g. `cart_conflict`.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// `details` of a 409 `cart_conflict` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartConflictDetails {
    pub current_restaurant: CartRestaurant,
}

/// `details` of a 403 `account_banned` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannedDetails {
    /// `None` for permanent bans.
    pub until: Option<DateTime<Utc>>,
    pub reason: String,
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterCustomer {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRestaurant {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cuisine: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub location: GeoPoint,
    pub delivery_radius_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterCourier {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: String,
    pub vehicle: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub role: AccountRole,
    pub email: String,
    pub password: String,
}

/// Who the bearer token belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub role: AccountRole,
    pub account_id: i32,
    pub name: String,
    pub email: String,
    /// Restaurants and couriers only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_status: Option<ApprovalStatus>,
    /// Admins only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_role: Option<AdminRole>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Opaque bearer token. Only returned here.
    pub token: String,
    pub session: SessionInfo,
}

/// Returned by registration endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registered {
    pub role: AccountRole,
    pub account_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_status: Option<ApprovalStatus>,
}

// =============================================================================
// Restaurants and menus
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestaurantSearch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

impl RestaurantSearch {
    #[must_use]
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantView {
    pub id: RestaurantId,
    pub name: String,
    pub description: String,
    pub cuisine: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub location: GeoPoint,
    pub delivery_radius_km: f64,
    pub approval_status: ApprovalStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemView {
    pub id: MenuItemId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Money,
    pub is_available: bool,
}

/// Restaurant page: profile plus the items currently on offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantDetail {
    pub restaurant: RestaurantView,
    pub menu: Vec<MenuItemView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantProfileInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cuisine: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub location: GeoPoint,
    pub delivery_radius_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub price: Money,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

const fn default_true() -> bool {
    true
}

// =============================================================================
// Promotions and coupons
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionView {
    pub id: PromotionId,
    /// `None` for platform-wide promotions.
    pub restaurant_id: Option<RestaurantId>,
    pub title: String,
    pub percentage: u8,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Create/update a promotion. Restaurants may not set `restaurant_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionInput {
    #[serde(default)]
    pub restaurant_id: Option<RestaurantId>,
    pub title: String,
    pub percentage: u8,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponView {
    pub id: CouponId,
    pub code: String,
    pub amount: Money,
    pub min_subtotal: Money,
    pub max_uses: Option<i32>,
    pub times_used: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponInput {
    pub code: String,
    pub amount: Money,
    #[serde(default)]
    pub min_subtotal: Money,
    #[serde(default)]
    pub max_uses: Option<i32>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateCouponRequest {
    pub code: String,
    pub subtotal: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponValidation {
    pub code: String,
    pub amount: Money,
    /// What the coupon takes off `subtotal`.
    pub discount: Money,
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineView {
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartView {
    pub restaurant: Option<CartRestaurant>,
    pub items: Vec<CartLineView>,
    pub subtotal: Money,
    pub item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            restaurant: cart.restaurant().cloned(),
            items: cart
                .items()
                .iter()
                .map(|item| CartLineView {
                    menu_item_id: item.menu_item_id,
                    name: item.name.clone(),
                    unit_price: item.unit_price,
                    quantity: item.quantity,
                    line_total: item.line_total(),
                })
                .collect(),
            subtotal: cart.subtotal(),
            item_count: cart.item_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddToCartRequest {
    pub menu_item_id: MenuItemId,
    pub quantity: u32,
    /// Confirms discarding a cart from another restaurant.
    #[serde(default)]
    pub replace_existing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: u32,
}

// =============================================================================
// Checkout and orders
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub address_id: AddressId,
    #[serde(default)]
    pub promotion_id: Option<PromotionId>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub restaurant_id: RestaurantId,
    pub address_id: AddressId,
    pub distance_km: f64,
    pub discount: DiscountSelection,
    pub totals: OrderTotals,
    /// Items whose price changed since they were added to the cart.
    pub price_changes: Vec<PriceChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    /// Client-generated; retries of the same checkout reuse it.
    pub idempotency_key: Uuid,
    pub address_id: AddressId,
    #[serde(default)]
    pub promotion_id: Option<PromotionId>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemView {
    pub menu_item_id: Option<MenuItemId>,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderView {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub restaurant_id: RestaurantId,
    pub restaurant_name: String,
    pub courier_id: Option<CourierId>,
    pub status: OrderStatus,
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
    pub items: Vec<OrderItemView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

impl OrderListQuery {
    #[must_use]
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RejectOrderRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

// =============================================================================
// Addresses
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressView {
    pub id: AddressId,
    pub label: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub location: GeoPoint,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressInput {
    pub label: String,
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    pub location: GeoPoint,
    #[serde(default)]
    pub is_default: bool,
}

// =============================================================================
// Messages and notifications
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: MessageId,
    pub sender: AccountRef,
    pub recipient: AccountRef,
    pub subject: String,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub recipient: AccountRef,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationView {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub body: String,
    pub order_id: Option<OrderId>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCount {
    pub unread: i64,
}

/// Result of a bulk update such as "mark all read".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Updated {
    pub updated: u64,
}

// =============================================================================
// Courier portal
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourierView {
    pub id: CourierId,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub vehicle: String,
    pub approval_status: ApprovalStatus,
    pub is_available: bool,
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierProfileInput {
    pub name: String,
    pub phone: String,
    pub vehicle: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityUpdate {
    pub is_available: bool,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

// =============================================================================
// Admin
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub customers: i64,
    pub restaurants: i64,
    pub couriers: i64,
    pub pending_restaurants: i64,
    pub pending_couriers: i64,
    pub orders_today: i64,
    pub revenue_today: Money,
    pub active_bans: i64,
}

/// Sortable columns of the admin account lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountSort {
    Name,
    Email,
    #[default]
    CreatedAt,
}

impl AccountSort {
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountListQuery {
    /// Case-insensitive match on name or email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Ignored for customers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ApprovalStatus>,
    #[serde(default)]
    pub sort: AccountSort,
    #[serde(default)]
    pub direction: SortDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

impl AccountListQuery {
    #[must_use]
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account: AccountRef,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_status: Option<ApprovalStatus>,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalUpdate {
    pub status: ApprovalStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBanRequest {
    pub target: AccountRef,
    pub reason: String,
    pub duration: crate::moderation::BanDuration,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BanListQuery {
    #[serde(default)]
    pub active_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

impl BanListQuery {
    #[must_use]
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUserView {
    pub id: AdminUserId,
    pub email: String,
    pub name: String,
    pub role: AdminRole,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::{AddItem, CartConflictPolicy};

    #[test]
    fn test_error_body_omits_empty_details() {
        let body = ErrorBody {
            error: "not_found".to_string(),
            message: "Not found".to_string(),
            details: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_add_to_cart_defaults_to_keep() {
        let req: AddToCartRequest =
            serde_json::from_str(r#"{"menu_item_id":4,"quantity":2}"#).unwrap();
        assert!(!req.replace_existing);
        assert_eq!(req.menu_item_id, MenuItemId::new(4));
    }

    #[test]
    fn test_cart_view_lines() {
        let mut cart = Cart::new();
        cart.add_item(
            AddItem {
                restaurant: CartRestaurant {
                    id: RestaurantId::new(2),
                    name: "Dosa Hut".to_string(),
                },
                menu_item_id: MenuItemId::new(8),
                name: "Masala Dosa".to_string(),
                unit_price: Money::from_cents(899),
                quantity: 2,
            },
            CartConflictPolicy::Keep,
        )
        .unwrap();

        let view = CartView::from(&cart);
        assert_eq!(view.item_count, 2);
        assert_eq!(view.items.first().unwrap().line_total, Money::from_cents(1798));
        assert_eq!(view.subtotal, Money::from_cents(1798));
    }

    #[test]
    fn test_account_list_query_defaults() {
        let query: AccountListQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.sort, AccountSort::CreatedAt);
        assert_eq!(query.direction, SortDirection::Asc);
        assert_eq!(query.page_request(), PageRequest::default());
    }
}
