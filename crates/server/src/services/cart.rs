//! Persistent customer carts.
//!
//! The cart rules live in `gobble_core::cart`; this service checks the menu
//! and the restaurant before each change and saves the result.

use gobble_core::api::AddToCartRequest;
use gobble_core::cart::{AddItem, AddOutcome, Cart, CartConflictPolicy, CartError, CartRestaurant};
use gobble_core::{CustomerId, MenuItemId};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};

use crate::db::{CartRepository, MenuRepository, RepositoryError, RestaurantRepository, carts};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartServiceError {
    /// A cart rule was violated (including the single-restaurant rule).
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("menu item {0} not found")]
    ItemNotFound(MenuItemId),

    #[error("menu item {0} is not available")]
    ItemUnavailable(MenuItemId),

    /// The restaurant is not approved or is banned.
    #[error("restaurant is not taking orders")]
    RestaurantUnavailable,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Cart service for one customer at a time.
pub struct CartService<'a> {
    pool: &'a PgPool,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The customer's saved cart (empty if none).
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if loading fails.
    pub async fn get(&self, customer_id: CustomerId) -> Result<Cart, CartServiceError> {
        Ok(CartRepository::new(self.pool).get(customer_id).await?)
    }

    /// Add a menu item to the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Cart(CartError::DifferentRestaurant)` when
    /// the cart belongs to another restaurant and `replace_existing` is not
    /// set, and the item/restaurant errors when the item cannot be ordered.
    #[instrument(skip(self, request), fields(customer_id = %customer_id, menu_item_id = %request.menu_item_id))]
    pub async fn add_item(
        &self,
        customer_id: CustomerId,
        request: &AddToCartRequest,
    ) -> Result<Cart, CartServiceError> {
        let item = MenuRepository::new(self.pool)
            .get(request.menu_item_id)
            .await?
            .ok_or(CartServiceError::ItemNotFound(request.menu_item_id))?;
        if !item.is_available {
            return Err(CartServiceError::ItemUnavailable(item.id));
        }

        let restaurant = RestaurantRepository::new(self.pool)
            .get_open(item.restaurant_id)
            .await?
            .ok_or(CartServiceError::RestaurantUnavailable)?;

        let add = AddItem {
            restaurant: CartRestaurant {
                id: restaurant.id,
                name: restaurant.name,
            },
            menu_item_id: item.id,
            name: item.name,
            unit_price: item.price,
            quantity: request.quantity,
        };
        let policy = CartConflictPolicy::from_confirmation(request.replace_existing);
        let (cart, outcome) = self
            .modify(customer_id, |cart| Ok(cart.add_item(add, policy)?))
            .await?;

        if let AddOutcome::Replaced { previous } = outcome {
            info!(previous_restaurant = %previous.id, "Cart replaced with items from another restaurant");
        }
        Ok(cart)
    }

    /// Set the quantity of a cart line; zero removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Cart` if the item is not in the cart or the
    /// quantity is too large.
    pub async fn update_quantity(
        &self,
        customer_id: CustomerId,
        menu_item_id: MenuItemId,
        quantity: u32,
    ) -> Result<Cart, CartServiceError> {
        let (cart, ()) = self
            .modify(customer_id, |cart| Ok(cart.update_quantity(menu_item_id, quantity)?))
            .await?;
        Ok(cart)
    }

    /// Remove a line from the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Cart` if the item is not in the cart.
    pub async fn remove_item(
        &self,
        customer_id: CustomerId,
        menu_item_id: MenuItemId,
    ) -> Result<Cart, CartServiceError> {
        let (cart, ()) = self
            .modify(customer_id, |cart| Ok(cart.remove_item(menu_item_id)?))
            .await?;
        Ok(cart)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if the delete fails.
    pub async fn clear(&self, customer_id: CustomerId) -> Result<(), CartServiceError> {
        CartRepository::new(self.pool).delete(customer_id).await?;
        Ok(())
    }

    /// Apply `change` to the customer's cart under the cart lock and save
    /// the result. Nothing is written if `change` fails.
    async fn modify<T>(
        &self,
        customer_id: CustomerId,
        change: impl FnOnce(&mut Cart) -> Result<T, CartServiceError>,
    ) -> Result<(Cart, T), CartServiceError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        carts::lock_in(&mut *tx, customer_id).await?;
        let mut cart = carts::get_in(&mut *tx, customer_id).await?;
        let output = change(&mut cart)?;
        carts::save_in(&mut *tx, customer_id, &cart).await?;
        tx.commit().await.map_err(RepositoryError::from)?;
        Ok((cart, output))
    }
}
