//! One checkout, however many times it has to be submitted.

use gobble_core::api::PlaceOrderRequest;
use gobble_core::{AddressId, PromotionId};
use uuid::Uuid;

use crate::client::ApiClient;
use crate::endpoints::PlacedOrder;
use crate::error::ClientError;

/// A checkout the customer has confirmed.
///
/// The idempotency key is generated once and reused by every
/// [`submit`](Self::submit), so a retry after a timeout or dropped
/// connection returns the order the first attempt created.
#[derive(Debug, Clone)]
pub struct CheckoutAttempt {
    request: PlaceOrderRequest,
}

impl CheckoutAttempt {
    #[must_use]
    pub fn new(address_id: AddressId) -> Self {
        Self {
            request: PlaceOrderRequest {
                idempotency_key: Uuid::new_v4(),
                address_id,
                promotion_id: None,
                coupon_code: None,
                note: None,
            },
        }
    }

    /// Apply a promotion. Any coupon chosen earlier is dropped; an order
    /// takes one discount or the other.
    #[must_use]
    pub fn with_promotion(mut self, promotion_id: PromotionId) -> Self {
        self.request.promotion_id = Some(promotion_id);
        self.request.coupon_code = None;
        self
    }

    /// Apply a coupon code. Any promotion chosen earlier is dropped.
    #[must_use]
    pub fn with_coupon(mut self, code: impl Into<String>) -> Self {
        self.request.coupon_code = Some(code.into());
        self.request.promotion_id = None;
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.request.note = Some(note.into());
        self
    }

    #[must_use]
    pub const fn idempotency_key(&self) -> Uuid {
        self.request.idempotency_key
    }

    /// Submit the order. Safe to call again after any error.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::PricesChanged` if the cart was repriced; the
    /// same attempt can be submitted again once the customer confirms.
    pub async fn submit(&self, client: &ApiClient) -> Result<PlacedOrder, ClientError> {
        client.place_order(&self.request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_key() {
        let attempt = CheckoutAttempt::new(AddressId::new(3));
        let key = attempt.idempotency_key();
        let attempt = attempt
            .with_coupon("WELCOME5")
            .with_note("Ring twice");
        assert_eq!(attempt.idempotency_key(), key);
        assert_eq!(attempt.request.coupon_code.as_deref(), Some("WELCOME5"));
    }

    #[test]
    fn test_coupon_replaces_promotion() {
        let attempt = CheckoutAttempt::new(AddressId::new(1))
            .with_promotion(PromotionId::new(7))
            .with_coupon("SAVE5");
        assert_eq!(attempt.request.promotion_id, None);
        assert_eq!(attempt.request.coupon_code.as_deref(), Some("SAVE5"));
    }

    #[test]
    fn test_promotion_replaces_coupon() {
        let attempt = CheckoutAttempt::new(AddressId::new(1))
            .with_coupon("SAVE5")
            .with_promotion(PromotionId::new(7));
        assert_eq!(attempt.request.promotion_id, Some(PromotionId::new(7)));
        assert_eq!(attempt.request.coupon_code, None);
    }

    #[test]
    fn test_separate_checkouts_get_separate_keys() {
        let a = CheckoutAttempt::new(AddressId::new(1));
        let b = CheckoutAttempt::new(AddressId::new(1));
        assert_ne!(a.idempotency_key(), b.idempotency_key());
    }
}
