//! Restaurant portal: profile, menu, incoming orders, promotions.

use gobble_core::api::{
    MenuItemInput, MenuItemView, OrderListQuery, OrderView, PromotionInput, PromotionView,
    RejectOrderRequest, RestaurantProfileInput, RestaurantView,
};
use gobble_core::listing::Page;
use gobble_core::{MenuItemId, OrderId, PromotionId};
use tracing::instrument;

use crate::client::ApiClient;
use crate::error::ClientError;

impl ApiClient {
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn restaurant_profile(&self) -> Result<RestaurantView, ClientError> {
        self.get("api/restaurant/profile").await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, input))]
    pub async fn update_restaurant_profile(
        &self,
        input: &RestaurantProfileInput,
    ) -> Result<RestaurantView, ClientError> {
        self.put("api/restaurant/profile", input).await
    }

    /// The whole menu, unavailable items included.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn menu(&self) -> Result<Vec<MenuItemView>, ClientError> {
        self.get("api/restaurant/menu").await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, input))]
    pub async fn create_menu_item(&self, input: &MenuItemInput) -> Result<MenuItemView, ClientError> {
        self.post("api/restaurant/menu", input).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, input))]
    pub async fn update_menu_item(
        &self,
        id: MenuItemId,
        input: &MenuItemInput,
    ) -> Result<MenuItemView, ClientError> {
        self.put(&format!("api/restaurant/menu/{id}"), input).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn delete_menu_item(&self, id: MenuItemId) -> Result<(), ClientError> {
        self.delete(&format!("api/restaurant/menu/{id}")).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn restaurant_orders(
        &self,
        query: &OrderListQuery,
    ) -> Result<Page<OrderView>, ClientError> {
        self.get_query("api/restaurant/orders", query).await
    }

    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 409 if the order is no longer
    /// pending.
    #[instrument(skip(self))]
    pub async fn accept_order(&self, id: OrderId) -> Result<OrderView, ClientError> {
        self.post_action(&format!("api/restaurant/orders/{id}/accept"))
            .await
    }

    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 409 if the order is no longer
    /// pending.
    #[instrument(skip(self))]
    pub async fn reject_order(
        &self,
        id: OrderId,
        reason: Option<&str>,
    ) -> Result<OrderView, ClientError> {
        let request = RejectOrderRequest {
            reason: reason.map(ToOwned::to_owned),
        };
        self.post(&format!("api/restaurant/orders/{id}/reject"), &request)
            .await
    }

    /// Mark an accepted order ready for pickup. The server tries to
    /// dispatch it to the nearest available courier.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn mark_order_ready(&self, id: OrderId) -> Result<OrderView, ClientError> {
        self.post_action(&format!("api/restaurant/orders/{id}/ready"))
            .await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn portal_promotions(&self) -> Result<Vec<PromotionView>, ClientError> {
        self.get("api/restaurant/promotions").await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, input))]
    pub async fn create_restaurant_promotion(
        &self,
        input: &PromotionInput,
    ) -> Result<PromotionView, ClientError> {
        self.post("api/restaurant/promotions", input).await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, input))]
    pub async fn update_restaurant_promotion(
        &self,
        id: PromotionId,
        input: &PromotionInput,
    ) -> Result<PromotionView, ClientError> {
        self.put(&format!("api/restaurant/promotions/{id}"), input)
            .await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn delete_restaurant_promotion(&self, id: PromotionId) -> Result<(), ClientError> {
        self.delete(&format!("api/restaurant/promotions/{id}")).await
    }
}
