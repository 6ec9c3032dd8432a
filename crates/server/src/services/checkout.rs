//! Checkout: quoting and placing orders.
//!
//! Both paths re-price the cart from the current menu, resolve the requested
//! discount, and run `CheckoutDraft::validate`. Placing an order is
//! idempotent on the client's key: a replay returns the order created by the
//! first attempt.

use chrono::Utc;
use gobble_core::api::{
    CouponValidation, PlaceOrderRequest, QuoteRequest, QuoteResponse, ValidateCouponRequest,
};
use gobble_core::cart::{Cart, CartError, PriceChange};
use gobble_core::checkout::{CheckoutDraft, CheckoutError, CheckoutPlan};
use gobble_core::pricing::{DiscountRequest, PricingError, normalize_coupon_code};
use gobble_core::{AddressId, CouponId, CustomerId, MenuItemId, NotificationKind, PromotionId};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::ServerConfig;
use crate::db::{
    AddressRepository, CouponRepository, MenuRepository, OrderRepository, PromotionRepository,
    RepositoryError, RestaurantRepository, carts, coupons, orders,
};
use crate::models::{Address, NewOrder, Order, OrderItem, Restaurant};
use crate::services::notify::Notifier;

/// Errors from quoting or placing an order.
#[derive(Debug, Error)]
pub enum CheckoutServiceError {
    /// Empty cart, no address, or address out of range.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Promotion and coupon requested together, or a blank code.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("address not found")]
    AddressNotFound,

    #[error("promotion cannot be applied: {0}")]
    PromotionInvalid(String),

    #[error("coupon cannot be applied: {0}")]
    CouponInvalid(String),

    /// Menu prices changed since items were added. The cart has been updated.
    #[error("prices changed for {} item(s)", .0.len())]
    PricesChanged(Vec<PriceChange>),

    #[error("menu item {0} is no longer available")]
    ItemUnavailable(MenuItemId),

    #[error("restaurant is not taking orders")]
    RestaurantUnavailable,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutServiceError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(e.into())
    }
}

/// Everything a checkout needs, validated and priced.
struct Prepared {
    cart: Cart,
    restaurant: Restaurant,
    address: Address,
    plan: CheckoutPlan,
    price_changes: Vec<PriceChange>,
    coupon_id: Option<CouponId>,
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    config: &'a ServerConfig,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, config: &'a ServerConfig) -> Self {
        Self { pool, config }
    }

    /// Price the customer's cart for delivery to `address_id`.
    ///
    /// If menu prices changed, the repriced cart is saved and the changes are
    /// listed in the response.
    ///
    /// # Errors
    ///
    /// Returns any `CheckoutServiceError` except `PricesChanged`.
    #[instrument(skip(self, request), fields(customer_id = %customer_id))]
    pub async fn quote(
        &self,
        customer_id: CustomerId,
        request: &QuoteRequest,
    ) -> Result<QuoteResponse, CheckoutServiceError> {
        let mut tx = self.pool.begin().await?;
        carts::lock_in(&mut *tx, customer_id).await?;
        let cart = carts::get_in(&mut *tx, customer_id).await?;

        let prepared = self
            .prepare(
                cart,
                customer_id,
                request.address_id,
                request.promotion_id,
                request.coupon_code.as_deref(),
            )
            .await?;

        if !prepared.price_changes.is_empty() {
            carts::save_in(&mut *tx, customer_id, &prepared.cart).await?;
        }
        tx.commit().await?;

        Ok(QuoteResponse {
            restaurant_id: prepared.restaurant.id,
            address_id: prepared.address.id,
            distance_km: prepared.plan.distance_km,
            discount: prepared.plan.discount,
            totals: prepared.plan.totals,
            price_changes: prepared.price_changes,
        })
    }

    /// Place an order from the customer's cart.
    ///
    /// Returns the order and whether it was created by this call (`false`
    /// when the idempotency key was already used).
    ///
    /// # Errors
    ///
    /// Returns `CheckoutServiceError::PricesChanged` when the cart had stale
    /// prices (the cart is updated; the customer must confirm again), and the
    /// other variants for failed checks.
    #[instrument(
        skip(self, request),
        fields(customer_id = %customer_id, idempotency_key = %request.idempotency_key)
    )]
    pub async fn place_order(
        &self,
        customer_id: CustomerId,
        request: &PlaceOrderRequest,
    ) -> Result<(Order, bool), CheckoutServiceError> {
        // The order is built from the cart read under the cart lock, and the
        // same transaction deletes it, so items added meanwhile stay in the
        // cart for the next order.
        let mut tx = self.pool.begin().await?;
        carts::lock_in(&mut *tx, customer_id).await?;

        // Checked under the lock: a concurrent attempt with the same key has
        // either committed its order or not started.
        if let Some(existing) = self.replayed(customer_id, request).await? {
            return Ok((existing, false));
        }

        let cart = carts::get_in(&mut *tx, customer_id).await?;

        let prepared = self
            .prepare(
                cart,
                customer_id,
                request.address_id,
                request.promotion_id,
                request.coupon_code.as_deref(),
            )
            .await?;

        if !prepared.price_changes.is_empty() {
            carts::save_in(&mut *tx, customer_id, &prepared.cart).await?;
            tx.commit().await?;
            return Err(CheckoutServiceError::PricesChanged(prepared.price_changes));
        }

        let new_order = new_order(customer_id, request, &prepared);

        if let Some(coupon_id) = prepared.coupon_id
            && !coupons::redeem_in(&mut *tx, coupon_id).await?
        {
            return Err(CheckoutServiceError::CouponInvalid(
                "coupon is no longer valid".to_owned(),
            ));
        }

        let Some(order_id) = orders::insert_in(&mut *tx, &new_order).await? else {
            // A concurrent attempt with the same key won; undo our coupon use.
            tx.rollback().await?;
            let existing = self
                .replayed(customer_id, request)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            return Ok((existing, false));
        };

        carts::delete_in(&mut *tx, customer_id).await?;
        tx.commit().await?;

        let order = OrderRepository::new(self.pool)
            .get(order_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        info!(order_id = %order.id, total = %order.total, "Order placed");
        Notifier::new(self.pool)
            .order_event(&order, NotificationKind::OrderPlaced)
            .await;

        Ok((order, true))
    }

    /// Check a coupon code against a subtotal without placing an order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutServiceError::CouponInvalid` if the code is unknown or
    /// cannot be redeemed.
    pub async fn validate_coupon(
        &self,
        request: &ValidateCouponRequest,
    ) -> Result<CouponValidation, CheckoutServiceError> {
        let code = normalize_coupon_code(&request.code);
        if code.is_empty() {
            return Err(PricingError::EmptyCouponCode.into());
        }

        let coupon = CouponRepository::new(self.pool)
            .by_code(&code)
            .await?
            .ok_or_else(|| CheckoutServiceError::CouponInvalid("unknown coupon code".to_owned()))?;
        coupon
            .check_redeemable(request.subtotal, Utc::now())
            .map_err(|r| CheckoutServiceError::CouponInvalid(r.to_string()))?;

        Ok(CouponValidation {
            code: coupon.code,
            amount: coupon.amount,
            discount: Ord::min(coupon.amount, request.subtotal),
        })
    }

    async fn replayed(
        &self,
        customer_id: CustomerId,
        request: &PlaceOrderRequest,
    ) -> Result<Option<Order>, CheckoutServiceError> {
        let mut conn = self.pool.acquire().await?;
        let Some(id) =
            orders::find_by_idempotency_key_in(&mut *conn, customer_id, request.idempotency_key)
                .await?
        else {
            return Ok(None);
        };
        drop(conn);

        info!(order_id = %id, "Replayed order placement");
        Ok(OrderRepository::new(self.pool).get(id).await?)
    }

    async fn prepare(
        &self,
        mut cart: Cart,
        customer_id: CustomerId,
        address_id: AddressId,
        promotion_id: Option<PromotionId>,
        coupon_code: Option<&str>,
    ) -> Result<Prepared, CheckoutServiceError> {
        let discount = DiscountRequest::from_request(promotion_id, coupon_code)?;

        let Some(cart_restaurant) = cart.restaurant().cloned() else {
            return Err(CheckoutError::EmptyCart.into());
        };
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart.into());
        }

        let restaurant = RestaurantRepository::new(self.pool)
            .get_open(cart_restaurant.id)
            .await?
            .ok_or(CheckoutServiceError::RestaurantUnavailable)?;

        let ids: Vec<MenuItemId> = cart.items().iter().map(|l| l.menu_item_id).collect();
        let prices = MenuRepository::new(self.pool)
            .current_prices(restaurant.id, &ids)
            .await?;
        let price_changes = cart.reprice(&prices).map_err(|e| match e {
            CartError::ItemUnavailable(id) | CartError::ItemNotInCart(id) => {
                CheckoutServiceError::ItemUnavailable(id)
            }
            other => CheckoutServiceError::Repository(RepositoryError::DataCorruption(
                other.to_string(),
            )),
        })?;

        let address = AddressRepository::new(self.pool)
            .get(customer_id, address_id)
            .await?
            .ok_or(CheckoutServiceError::AddressNotFound)?;

        let mut draft = CheckoutDraft::new();
        draft.select_address(address.checkout_address());

        let now = Utc::now();
        let mut coupon_id = None;
        match discount {
            DiscountRequest::None => {}
            DiscountRequest::Promotion(id) => {
                let promotion = PromotionRepository::new(self.pool)
                    .get(id)
                    .await?
                    .ok_or_else(|| {
                        CheckoutServiceError::PromotionInvalid("unknown promotion".to_owned())
                    })?;
                if !promotion.applies_to(restaurant.id) {
                    return Err(CheckoutServiceError::PromotionInvalid(
                        "promotion does not apply to this restaurant".to_owned(),
                    ));
                }
                if !promotion.is_live(now) {
                    return Err(CheckoutServiceError::PromotionInvalid(
                        "promotion is not active".to_owned(),
                    ));
                }
                draft.select_promotion(promotion.id, promotion.percentage)?;
            }
            DiscountRequest::Coupon(code) => {
                let coupon = CouponRepository::new(self.pool)
                    .by_code(&code)
                    .await?
                    .ok_or_else(|| {
                        CheckoutServiceError::CouponInvalid("unknown coupon code".to_owned())
                    })?;
                coupon
                    .check_redeemable(cart.subtotal(), now)
                    .map_err(|r| CheckoutServiceError::CouponInvalid(r.to_string()))?;
                draft.select_coupon(&coupon.code, coupon.amount)?;
                coupon_id = Some(coupon.id);
            }
        }

        let plan = draft.validate(&cart, &restaurant.delivery_zone(), self.config.delivery_fee)?;

        Ok(Prepared {
            cart,
            restaurant,
            address,
            plan,
            price_changes,
            coupon_id,
        })
    }
}

fn new_order(customer_id: CustomerId, request: &PlaceOrderRequest, prepared: &Prepared) -> NewOrder {
    let totals = &prepared.plan.totals;
    NewOrder {
        customer_id,
        restaurant_id: prepared.restaurant.id,
        idempotency_key: request.idempotency_key,
        delivery_address: prepared.address.one_line(),
        delivery_location: prepared.address.location,
        subtotal: totals.subtotal,
        discount: totals.discount,
        delivery_fee: totals.delivery_fee,
        total: totals.total,
        promotion_id: prepared.plan.discount.promotion_id(),
        coupon_id: prepared.coupon_id,
        note: request
            .note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_owned),
        items: prepared
            .cart
            .items()
            .iter()
            .map(|line| OrderItem {
                menu_item_id: Some(line.menu_item_id),
                name: line.name.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity,
            })
            .collect(),
    }
}
