//! The customer's cart.

use gobble_core::MenuItemId;
use gobble_core::api::{AddToCartRequest, CartView, UpdateCartItemRequest};
use tracing::instrument;

use crate::client::ApiClient;
use crate::error::ClientError;

impl ApiClient {
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn cart(&self) -> Result<CartView, ClientError> {
        self.get("api/cart").await
    }

    /// Add an item to the cart.
    ///
    /// With `replace_existing` false, an item from a different restaurant
    /// fails with `ClientError::CartConflict` naming the restaurant the
    /// cart currently holds. Retry with `replace_existing` true once the
    /// user agrees to start over.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::CartConflict` as described above.
    #[instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        menu_item_id: MenuItemId,
        quantity: u32,
        replace_existing: bool,
    ) -> Result<CartView, ClientError> {
        let request = AddToCartRequest {
            menu_item_id,
            quantity,
            replace_existing,
        };
        self.post("api/cart/items", &request).await
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn update_cart_item(
        &self,
        menu_item_id: MenuItemId,
        quantity: u32,
    ) -> Result<CartView, ClientError> {
        self.patch(
            &format!("api/cart/items/{menu_item_id}"),
            &UpdateCartItemRequest { quantity },
        )
        .await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn remove_cart_item(&self, menu_item_id: MenuItemId) -> Result<CartView, ClientError> {
        self.delete_returning(&format!("api/cart/items/{menu_item_id}"))
            .await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<(), ClientError> {
        self.delete("api/cart").await
    }
}
