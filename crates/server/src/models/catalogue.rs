//! Menu items, promotions, and coupons.

use chrono::{DateTime, Utc};
use gobble_core::api::{CouponView, MenuItemView, PromotionView};
use gobble_core::{CouponId, MenuItemId, Money, PromotionId, RestaurantId};

#[derive(Debug, Clone)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Money,
    pub is_available: bool,
}

impl From<&MenuItem> for MenuItemView {
    fn from(m: &MenuItem) -> Self {
        Self {
            id: m.id,
            restaurant_id: m.restaurant_id,
            name: m.name.clone(),
            description: m.description.clone(),
            category: m.category.clone(),
            price: m.price,
            is_available: m.is_available,
        }
    }
}

/// A percentage discount, restaurant-specific or platform-wide.
#[derive(Debug, Clone)]
pub struct Promotion {
    pub id: PromotionId,
    pub restaurant_id: Option<RestaurantId>,
    pub title: String,
    pub percentage: u8,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl Promotion {
    /// Whether the promotion can be used at `now`.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.starts_at <= now && self.ends_at.is_none_or(|end| now < end)
    }

    /// Whether the promotion applies to orders from `restaurant_id`.
    #[must_use]
    pub fn applies_to(&self, restaurant_id: RestaurantId) -> bool {
        self.restaurant_id.is_none_or(|id| id == restaurant_id)
    }
}

impl From<&Promotion> for PromotionView {
    fn from(p: &Promotion) -> Self {
        Self {
            id: p.id,
            restaurant_id: p.restaurant_id,
            title: p.title.clone(),
            percentage: p.percentage,
            starts_at: p.starts_at,
            ends_at: p.ends_at,
            is_active: p.is_active,
        }
    }
}

/// Why a coupon cannot be redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponRejection {
    Inactive,
    Expired,
    Exhausted,
    BelowMinimum(Money),
}

impl std::fmt::Display for CouponRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inactive => f.write_str("coupon is not active"),
            Self::Expired => f.write_str("coupon has expired"),
            Self::Exhausted => f.write_str("coupon has reached its usage limit"),
            Self::BelowMinimum(min) => write!(f, "coupon requires a subtotal of at least {min}"),
        }
    }
}

/// A flat-amount discount code.
#[derive(Debug, Clone)]
pub struct Coupon {
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

impl Coupon {
    /// Check whether the coupon can be redeemed against `subtotal` at `now`.
    ///
    /// # Errors
    ///
    /// Returns the first `CouponRejection` that applies.
    pub fn check_redeemable(
        &self,
        subtotal: Money,
        now: DateTime<Utc>,
    ) -> Result<(), CouponRejection> {
        if !self.is_active {
            return Err(CouponRejection::Inactive);
        }
        if self.expires_at.is_some_and(|at| at <= now) {
            return Err(CouponRejection::Expired);
        }
        if self.max_uses.is_some_and(|max| self.times_used >= max) {
            return Err(CouponRejection::Exhausted);
        }
        if subtotal < self.min_subtotal {
            return Err(CouponRejection::BelowMinimum(self.min_subtotal));
        }
        Ok(())
    }
}

impl From<&Coupon> for CouponView {
    fn from(c: &Coupon) -> Self {
        Self {
            id: c.id,
            code: c.code.clone(),
            amount: c.amount,
            min_subtotal: c.min_subtotal,
            max_uses: c.max_uses,
            times_used: c.times_used,
            expires_at: c.expires_at,
            is_active: c.is_active,
            created_at: c.created_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn coupon() -> Coupon {
        Coupon {
            id: CouponId::new(1),
            code: "WELCOME5".to_string(),
            amount: Money::from_cents(500),
            min_subtotal: Money::from_cents(1500),
            max_uses: Some(100),
            times_used: 0,
            expires_at: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_coupon_redeemable() {
        assert!(
            coupon()
                .check_redeemable(Money::from_cents(2000), Utc::now())
                .is_ok()
        );
    }

    #[test]
    fn test_coupon_rejections() {
        let now = Utc::now();

        let below = coupon().check_redeemable(Money::from_cents(1000), now);
        assert_eq!(below, Err(CouponRejection::BelowMinimum(Money::from_cents(1500))));

        let mut exhausted = coupon();
        exhausted.times_used = 100;
        assert_eq!(
            exhausted.check_redeemable(Money::from_cents(2000), now),
            Err(CouponRejection::Exhausted)
        );

        let mut expired = coupon();
        expired.expires_at = Some(now - Duration::minutes(1));
        assert_eq!(
            expired.check_redeemable(Money::from_cents(2000), now),
            Err(CouponRejection::Expired)
        );

        let mut inactive = coupon();
        inactive.is_active = false;
        assert_eq!(
            inactive.check_redeemable(Money::from_cents(2000), now),
            Err(CouponRejection::Inactive)
        );
    }

    #[test]
    fn test_promotion_scope_and_window() {
        let now = Utc::now();
        let promo = Promotion {
            id: PromotionId::new(1),
            restaurant_id: Some(RestaurantId::new(3)),
            title: "Lunch deal".to_string(),
            percentage: 10,
            starts_at: now - Duration::hours(1),
            ends_at: Some(now + Duration::hours(1)),
            is_active: true,
        };
        assert!(promo.is_live(now));
        assert!(!promo.is_live(now + Duration::hours(2)));
        assert!(promo.applies_to(RestaurantId::new(3)));
        assert!(!promo.applies_to(RestaurantId::new(4)));

        let platform = Promotion {
            restaurant_id: None,
            ..promo
        };
        assert!(platform.applies_to(RestaurantId::new(4)));
    }
}
