//! Discounts and order totals.
//!
//! An order carries at most one discount: either a restaurant or platform
//! promotion (percentage off the subtotal) or a coupon (flat amount). The two
//! are never combined.

use serde::{Deserialize, Serialize};

use crate::types::{Money, PromotionId};

/// Errors from discount selection.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("a promotion and a coupon cannot be combined")]
    BothDiscounts,
    #[error("promotion percentage must be between 1 and 100 (got {0})")]
    PercentageOutOfRange(u8),
    #[error("coupon code cannot be empty")]
    EmptyCouponCode,
}

/// The discount a customer asked for, before it is resolved against the
/// database.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DiscountRequest {
    #[default]
    None,
    Promotion(PromotionId),
    Coupon(String),
}

impl DiscountRequest {
    /// Build from the optional request fields.
    ///
    /// Coupon codes are trimmed and uppercased; a blank code counts as absent.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::BothDiscounts` if both are present.
    pub fn from_request(
        promotion_id: Option<PromotionId>,
        coupon_code: Option<&str>,
    ) -> Result<Self, PricingError> {
        let coupon = coupon_code
            .map(normalize_coupon_code)
            .filter(|code| !code.is_empty());
        match (promotion_id, coupon) {
            (Some(_), Some(_)) => Err(PricingError::BothDiscounts),
            (Some(id), None) => Ok(Self::Promotion(id)),
            (None, Some(code)) => Ok(Self::Coupon(code)),
            (None, None) => Ok(Self::None),
        }
    }
}

/// Canonical form of a coupon code.
#[must_use]
pub fn normalize_coupon_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// A resolved discount.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscountSelection {
    #[default]
    None,
    Promotion { id: PromotionId, percentage: u8 },
    Coupon { code: String, amount: Money },
}

impl DiscountSelection {
    /// Select a promotion, dropping any coupon.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::PercentageOutOfRange` unless `1..=100`.
    pub fn select_promotion(&mut self, id: PromotionId, percentage: u8) -> Result<(), PricingError> {
        if !(1..=100).contains(&percentage) {
            return Err(PricingError::PercentageOutOfRange(percentage));
        }
        *self = Self::Promotion { id, percentage };
        Ok(())
    }

    /// Select a coupon, dropping any promotion.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::EmptyCouponCode` for a blank code.
    pub fn select_coupon(&mut self, code: &str, amount: Money) -> Result<(), PricingError> {
        let code = normalize_coupon_code(code);
        if code.is_empty() {
            return Err(PricingError::EmptyCouponCode);
        }
        *self = Self::Coupon { code, amount };
        Ok(())
    }

    pub fn clear(&mut self) {
        *self = Self::None;
    }

    /// Amount taken off `subtotal`. Never more than the subtotal.
    #[must_use]
    pub fn discount_amount(&self, subtotal: Money) -> Money {
        match self {
            Self::None => Money::ZERO,
            Self::Promotion { percentage, .. } => subtotal.percentage(*percentage).min(subtotal),
            Self::Coupon { amount, .. } => (*amount).min(subtotal),
        }
    }

    #[must_use]
    pub const fn promotion_id(&self) -> Option<PromotionId> {
        match self {
            Self::Promotion { id, .. } => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn coupon_code(&self) -> Option<&str> {
        match self {
            Self::Coupon { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Breakdown of what the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub delivery_fee: Money,
    pub total: Money,
}

impl OrderTotals {
    /// `total = max(subtotal - discount, 0) + delivery_fee`, with the
    /// discount capped at the subtotal.
    #[must_use]
    pub fn compute(subtotal: Money, discount: Money, delivery_fee: Money) -> Self {
        let discount = discount.min(subtotal);
        Self {
            subtotal,
            discount,
            delivery_fee,
            total: subtotal.saturating_sub(discount) + delivery_fee,
        }
    }

    /// Totals for a subtotal with the given discount applied.
    #[must_use]
    pub fn for_selection(subtotal: Money, selection: &DiscountSelection, delivery_fee: Money) -> Self {
        Self::compute(subtotal, selection.discount_amount(subtotal), delivery_fee)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_rejects_both() {
        let result = DiscountRequest::from_request(Some(PromotionId::new(1)), Some("SAVE5"));
        assert_eq!(result, Err(PricingError::BothDiscounts));
    }

    #[test]
    fn test_request_blank_coupon_is_none() {
        assert_eq!(
            DiscountRequest::from_request(None, Some("   ")),
            Ok(DiscountRequest::None)
        );
        assert_eq!(
            DiscountRequest::from_request(None, Some(" save5 ")),
            Ok(DiscountRequest::Coupon("SAVE5".to_string()))
        );
    }

    #[test]
    fn test_selecting_one_clears_the_other() {
        let mut selection = DiscountSelection::default();
        selection.select_promotion(PromotionId::new(3), 20).unwrap();
        selection
            .select_coupon("FIVEOFF", Money::from_cents(500))
            .unwrap();
        assert_eq!(selection.promotion_id(), None);
        assert_eq!(selection.coupon_code(), Some("FIVEOFF"));

        selection.select_promotion(PromotionId::new(3), 20).unwrap();
        assert_eq!(selection.coupon_code(), None);
        assert_eq!(selection.promotion_id(), Some(PromotionId::new(3)));
    }

    #[test]
    fn test_promotion_percentage_bounds() {
        let mut selection = DiscountSelection::default();
        assert_eq!(
            selection.select_promotion(PromotionId::new(1), 0),
            Err(PricingError::PercentageOutOfRange(0))
        );
        assert_eq!(
            selection.select_promotion(PromotionId::new(1), 101),
            Err(PricingError::PercentageOutOfRange(101))
        );
        assert_eq!(selection, DiscountSelection::None);
    }

    #[test]
    fn test_promotion_discount() {
        let selection = DiscountSelection::Promotion {
            id: PromotionId::new(1),
            percentage: 15,
        };
        assert_eq!(
            selection.discount_amount(Money::from_cents(4000)),
            Money::from_cents(600)
        );
    }

    #[test]
    fn test_coupon_capped_at_subtotal() {
        let selection = DiscountSelection::Coupon {
            code: "BIG".to_string(),
            amount: Money::from_cents(2500),
        };
        let subtotal = Money::from_cents(1800);
        assert_eq!(selection.discount_amount(subtotal), subtotal);

        let totals = OrderTotals::for_selection(subtotal, &selection, Money::from_cents(299));
        assert_eq!(totals.discount, subtotal);
        assert_eq!(totals.total, Money::from_cents(299));
    }

    #[test]
    fn test_totals_without_discount() {
        let totals = OrderTotals::compute(
            Money::from_cents(2350),
            Money::ZERO,
            Money::from_cents(299),
        );
        assert_eq!(totals.total, Money::from_cents(2649));
    }

    #[test]
    fn test_totals_clamp_oversized_discount() {
        let totals = OrderTotals::compute(
            Money::from_cents(1000),
            Money::from_cents(5000),
            Money::ZERO,
        );
        assert_eq!(totals.discount, Money::from_cents(1000));
        assert_eq!(totals.total, Money::ZERO);
    }

    #[test]
    fn test_selection_json_is_tagged() {
        let json = serde_json::to_value(DiscountSelection::Coupon {
            code: "SAVE5".to_string(),
            amount: Money::from_cents(500),
        })
        .unwrap();
        assert_eq!(json["kind"], "coupon");
        assert_eq!(json["amount"], "5.00");
    }
}
