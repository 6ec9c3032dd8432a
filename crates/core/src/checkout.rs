//! Checkout validation.
//!
//! A [`CheckoutDraft`] collects what the customer picked on the checkout page
//! (delivery address and discount). [`CheckoutDraft::validate`] checks it
//! against the cart and the restaurant's delivery zone and yields the priced
//! [`CheckoutPlan`] an order is created from.

use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::pricing::{DiscountSelection, OrderTotals, PricingError};
use crate::types::{AddressId, GeoPoint, Money, PromotionId};

/// Reasons a checkout cannot proceed.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CheckoutError {
    #[error("your cart is empty")]
    EmptyCart,
    #[error("select a delivery address")]
    MissingAddress,
    #[error("address is {distance_km:.1} km away; this restaurant delivers within {radius_km:.1} km")]
    OutOfRange { distance_km: f64, radius_km: f64 },
}

/// Where a restaurant delivers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeliveryZone {
    pub origin: GeoPoint,
    pub radius_km: f64,
}

impl DeliveryZone {
    #[must_use]
    pub const fn new(origin: GeoPoint, radius_km: f64) -> Self {
        Self { origin, radius_km }
    }

    #[must_use]
    pub fn distance_to(&self, point: &GeoPoint) -> f64 {
        self.origin.distance_km(point)
    }

    /// Whether `point` lies within the radius (inclusive).
    #[must_use]
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.distance_to(point) <= self.radius_km
    }
}

/// A delivery address as far as checkout is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckoutAddress {
    pub id: AddressId,
    pub location: GeoPoint,
}

/// Selections made on the checkout page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckoutDraft {
    address: Option<CheckoutAddress>,
    discount: DiscountSelection,
}

impl CheckoutDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_address(&mut self, address: CheckoutAddress) {
        self.address = Some(address);
    }

    /// See [`DiscountSelection::select_promotion`].
    ///
    /// # Errors
    ///
    /// Propagates `PricingError`.
    pub fn select_promotion(&mut self, id: PromotionId, percentage: u8) -> Result<(), PricingError> {
        self.discount.select_promotion(id, percentage)
    }

    /// See [`DiscountSelection::select_coupon`].
    ///
    /// # Errors
    ///
    /// Propagates `PricingError`.
    pub fn select_coupon(&mut self, code: &str, amount: Money) -> Result<(), PricingError> {
        self.discount.select_coupon(code, amount)
    }

    pub fn clear_discount(&mut self) {
        self.discount.clear();
    }

    #[must_use]
    pub const fn address(&self) -> Option<&CheckoutAddress> {
        self.address.as_ref()
    }

    #[must_use]
    pub const fn discount(&self) -> &DiscountSelection {
        &self.discount
    }

    /// Validate and price the order.
    ///
    /// Checks run in this order: empty cart, missing address, delivery range.
    ///
    /// # Errors
    ///
    /// Returns the first failing `CheckoutError`.
    pub fn validate(
        &self,
        cart: &Cart,
        zone: &DeliveryZone,
        delivery_fee: Money,
    ) -> Result<CheckoutPlan, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let address = self.address.ok_or(CheckoutError::MissingAddress)?;

        let distance_km = zone.distance_to(&address.location);
        if distance_km > zone.radius_km {
            return Err(CheckoutError::OutOfRange {
                distance_km,
                radius_km: zone.radius_km,
            });
        }

        let totals = OrderTotals::for_selection(cart.subtotal(), &self.discount, delivery_fee);
        Ok(CheckoutPlan {
            address_id: address.id,
            distance_km,
            discount: self.discount.clone(),
            totals,
        })
    }
}

/// A validated, priced checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutPlan {
    pub address_id: AddressId,
    pub distance_km: f64,
    pub discount: DiscountSelection,
    pub totals: OrderTotals,
}
