//! Courier portal.

use gobble_core::api::{AvailabilityUpdate, CourierProfileInput, CourierView, OrderListQuery, OrderView};
use gobble_core::listing::Page;
use gobble_core::{GeoPoint, OrderId};
use tracing::instrument;

use crate::client::ApiClient;
use crate::error::ClientError;

impl ApiClient {
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn courier_profile(&self) -> Result<CourierView, ClientError> {
        self.get("api/courier/profile").await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, input))]
    pub async fn update_courier_profile(
        &self,
        input: &CourierProfileInput,
    ) -> Result<CourierView, ClientError> {
        self.put("api/courier/profile", input).await
    }

    /// Go on or off duty, optionally reporting the current position.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn set_availability(
        &self,
        is_available: bool,
        location: Option<GeoPoint>,
    ) -> Result<CourierView, ClientError> {
        let update = AvailabilityUpdate {
            is_available,
            location,
        };
        self.put("api/courier/availability", &update).await
    }

    /// Ready orders waiting for a courier.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn open_deliveries(&self) -> Result<Vec<OrderView>, ClientError> {
        self.get("api/courier/deliveries").await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn courier_orders(
        &self,
        query: &OrderListQuery,
    ) -> Result<Page<OrderView>, ClientError> {
        self.get_query("api/courier/orders", query).await
    }

    /// Take an unassigned ready order.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 409 if another courier got
    /// there first.
    #[instrument(skip(self))]
    pub async fn claim_order(&self, id: OrderId) -> Result<OrderView, ClientError> {
        self.post_action(&format!("api/courier/orders/{id}/claim"))
            .await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn pick_up_order(&self, id: OrderId) -> Result<OrderView, ClientError> {
        self.post_action(&format!("api/courier/orders/{id}/pickup"))
            .await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn deliver_order(&self, id: OrderId) -> Result<OrderView, ClientError> {
        self.post_action(&format!("api/courier/orders/{id}/deliver"))
            .await
    }
}
