//! Checkout and order history.

use gobble_core::OrderId;
use gobble_core::api::{OrderListQuery, OrderView, PlaceOrderRequest, QuoteRequest, QuoteResponse};
use gobble_core::listing::Page;
use reqwest::StatusCode;
use tracing::{info, instrument};

use crate::client::ApiClient;
use crate::error::ClientError;

/// Result of [`ApiClient::place_order`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub order: OrderView,
    /// The server had already accepted this idempotency key and returned
    /// the original order instead of creating a new one.
    pub replayed: bool,
}

impl ApiClient {
    /// Price the cart for delivery to an address.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 422 for an empty cart, an
    /// address out of range, or both a promotion and a coupon.
    #[instrument(skip(self))]
    pub async fn quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, ClientError> {
        self.post("api/checkout/quote", request).await
    }

    /// Place an order from the cart.
    ///
    /// Retrying with the same `idempotency_key` never creates a second
    /// order; see [`crate::CheckoutAttempt`].
    ///
    /// # Errors
    ///
    /// Returns `ClientError::PricesChanged` when menu prices moved since the
    /// items were added. The cart has been repriced; show the changes and
    /// ask the customer to confirm.
    #[instrument(skip(self, request), fields(key = %request.idempotency_key))]
    pub async fn place_order(&self, request: &PlaceOrderRequest) -> Result<PlacedOrder, ClientError> {
        let (status, order): (_, OrderView) = self.post_with_status("api/orders", request).await?;
        let replayed = status != StatusCode::CREATED;
        info!(order_id = %order.id, replayed, "Order placed");
        Ok(PlacedOrder { order, replayed })
    }

    /// Orders visible to the logged-in account, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn orders(&self, query: &OrderListQuery) -> Result<Page<OrderView>, ClientError> {
        self.get_query("api/orders", query).await
    }

    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 404 if the order does not
    /// exist or is not visible to this account.
    #[instrument(skip(self))]
    pub async fn order(&self, id: OrderId) -> Result<OrderView, ClientError> {
        self.get(&format!("api/orders/{id}")).await
    }

    /// Cancel an order the restaurant has not accepted yet.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 409 once the order has moved on.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, id: OrderId) -> Result<OrderView, ClientError> {
        self.post_action(&format!("api/orders/{id}/cancel")).await
    }
}
