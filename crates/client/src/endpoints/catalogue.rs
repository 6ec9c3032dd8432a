//! Public restaurant browsing.

use gobble_core::RestaurantId;
use gobble_core::api::{
    CouponValidation, PromotionView, RestaurantDetail, RestaurantSearch, RestaurantView,
    ValidateCouponRequest,
};
use gobble_core::listing::Page;
use gobble_core::Money;
use tracing::instrument;

use crate::client::ApiClient;
use crate::error::ClientError;

impl ApiClient {
    /// Search approved restaurants.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn restaurants(
        &self,
        search: &RestaurantSearch,
    ) -> Result<Page<RestaurantView>, ClientError> {
        self.get_query("api/restaurants", search).await
    }

    /// A restaurant's profile and available menu.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 404 for unknown or
    /// unapproved restaurants.
    #[instrument(skip(self))]
    pub async fn restaurant(&self, id: RestaurantId) -> Result<RestaurantDetail, ClientError> {
        self.get(&format!("api/restaurants/{id}")).await
    }

    /// Promotions running now at a restaurant, platform-wide ones included.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn restaurant_promotions(
        &self,
        id: RestaurantId,
    ) -> Result<Vec<PromotionView>, ClientError> {
        self.get(&format!("api/restaurants/{id}/promotions")).await
    }

    /// Check a coupon code against a subtotal without using it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 422 and the rejection reason
    /// when the coupon cannot be used.
    #[instrument(skip(self))]
    pub async fn validate_coupon(
        &self,
        code: &str,
        subtotal: Money,
    ) -> Result<CouponValidation, ClientError> {
        let request = ValidateCouponRequest {
            code: code.to_owned(),
            subtotal,
        };
        self.post("api/coupons/validate", &request).await
    }
}
