//! Customer cart.
//!
//! A cart holds menu items from exactly one restaurant. Adding an item from a
//! second restaurant never mixes the two: the caller either keeps the current
//! cart (and gets [`CartError::DifferentRestaurant`] back) or explicitly asks
//! for it to be replaced.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{MenuItemId, Money, RestaurantId};

/// Largest quantity allowed on one cart line.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Errors returned by cart mutations. The cart is unchanged on error.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// The cart already holds items from another restaurant.
    #[error("cart already contains items from {}", current.name)]
    DifferentRestaurant {
        /// Restaurant the cart currently belongs to.
        current: CartRestaurant,
    },
    /// Quantity of zero on add.
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    /// Line would exceed [`MAX_LINE_QUANTITY`].
    #[error("quantity cannot exceed {max}")]
    QuantityLimit {
        /// Maximum per line.
        max: u32,
    },
    /// The item is not in the cart.
    #[error("item {0} is not in the cart")]
    ItemNotInCart(MenuItemId),
    /// A cart item no longer exists on the menu.
    #[error("item {0} is no longer available")]
    ItemUnavailable(MenuItemId),
}

/// What to do when adding an item from a different restaurant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CartConflictPolicy {
    /// Leave the cart untouched and report the conflict.
    #[default]
    Keep,
    /// Discard the current cart and start a new one (user confirmed).
    Replace,
}

impl CartConflictPolicy {
    /// Policy for an explicit confirmation flag.
    #[must_use]
    pub const fn from_confirmation(replace_existing: bool) -> Self {
        if replace_existing {
            Self::Replace
        } else {
            Self::Keep
        }
    }
}

/// The restaurant a cart belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartRestaurant {
    pub id: RestaurantId,
    pub name: String,
}

/// One line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub menu_item_id: MenuItemId,
    pub name: String,
    /// Price when the item was added; re-checked at checkout.
    pub unit_price: Money,
    pub quantity: u32,
}

impl CartItem {
    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Input for [`Cart::add_item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddItem {
    pub restaurant: CartRestaurant,
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

/// Result of a successful [`Cart::add_item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new line was appended.
    Appended,
    /// An existing line's quantity was increased to `quantity`.
    Incremented { quantity: u32 },
    /// The previous cart was discarded in favour of the new item.
    Replaced { previous: CartRestaurant },
}

/// A price that changed between add-to-cart and checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceChange {
    pub menu_item_id: MenuItemId,
    pub old_price: Money,
    pub new_price: Money,
}

/// A single-restaurant cart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cart {
    restaurant: Option<CartRestaurant>,
    items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            restaurant: None,
            items: Vec::new(),
        }
    }

    /// The restaurant the cart belongs to, if any.
    #[must_use]
    pub const fn restaurant(&self) -> Option<&CartRestaurant> {
        self.restaurant.as_ref()
    }

    /// Cart lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Σ unit price × quantity.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Add an item, applying the single-restaurant merge rule.
    ///
    /// # Errors
    ///
    /// - `CartError::DifferentRestaurant` if the cart belongs to another
    ///   restaurant and `policy` is `Keep`
    /// - `CartError::ZeroQuantity` / `CartError::QuantityLimit` for bad quantities
    pub fn add_item(
        &mut self,
        item: AddItem,
        policy: CartConflictPolicy,
    ) -> Result<AddOutcome, CartError> {
        if item.quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        if item.quantity > MAX_LINE_QUANTITY {
            return Err(CartError::QuantityLimit {
                max: MAX_LINE_QUANTITY,
            });
        }

        let conflict = self
            .restaurant
            .as_ref()
            .filter(|current| current.id != item.restaurant.id && !self.items.is_empty())
            .cloned();

        if let Some(current) = conflict {
            return match policy {
                CartConflictPolicy::Keep => Err(CartError::DifferentRestaurant { current }),
                CartConflictPolicy::Replace => {
                    self.items.clear();
                    self.restaurant = Some(item.restaurant.clone());
                    self.items.push(line_from(item));
                    Ok(AddOutcome::Replaced { previous: current })
                }
            };
        }

        if let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.menu_item_id == item.menu_item_id)
        {
            let quantity = line.quantity + item.quantity;
            if quantity > MAX_LINE_QUANTITY {
                return Err(CartError::QuantityLimit {
                    max: MAX_LINE_QUANTITY,
                });
            }
            line.quantity = quantity;
            return Ok(AddOutcome::Incremented { quantity });
        }

        self.restaurant = Some(item.restaurant.clone());
        self.items.push(line_from(item));
        Ok(AddOutcome::Appended)
    }

    /// Set a line's quantity; zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotInCart` or `CartError::QuantityLimit`.
    pub fn update_quantity(
        &mut self,
        menu_item_id: MenuItemId,
        quantity: u32,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove_item(menu_item_id);
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(CartError::QuantityLimit {
                max: MAX_LINE_QUANTITY,
            });
        }
        let line = self
            .items
            .iter_mut()
            .find(|line| line.menu_item_id == menu_item_id)
            .ok_or(CartError::ItemNotInCart(menu_item_id))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove a line. An emptied cart no longer belongs to any restaurant.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotInCart` if the item is absent.
    pub fn remove_item(&mut self, menu_item_id: MenuItemId) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|line| line.menu_item_id != menu_item_id);
        if self.items.len() == before {
            return Err(CartError::ItemNotInCart(menu_item_id));
        }
        if self.items.is_empty() {
            self.restaurant = None;
        }
        Ok(())
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.items.clear();
        self.restaurant = None;
    }

    /// Refresh unit prices from the current menu.
    ///
    /// Returns the lines whose price changed. The cart is only updated when
    /// every item is still present in `current_prices`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemUnavailable` for the first missing item.
    pub fn reprice(
        &mut self,
        current_prices: &HashMap<MenuItemId, Money>,
    ) -> Result<Vec<PriceChange>, CartError> {
        if let Some(missing) = self
            .items
            .iter()
            .find(|line| !current_prices.contains_key(&line.menu_item_id))
        {
            return Err(CartError::ItemUnavailable(missing.menu_item_id));
        }

        let mut changes = Vec::new();
        for line in &mut self.items {
            if let Some(&price) = current_prices.get(&line.menu_item_id)
                && price != line.unit_price
            {
                changes.push(PriceChange {
                    menu_item_id: line.menu_item_id,
                    old_price: line.unit_price,
                    new_price: price,
                });
                line.unit_price = price;
            }
        }
        Ok(changes)
    }
}

fn line_from(item: AddItem) -> CartItem {
    CartItem {
        menu_item_id: item.menu_item_id,
        name: item.name,
        unit_price: item.unit_price,
        quantity: item.quantity,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn noodle_bar() -> CartRestaurant {
        CartRestaurant {
            id: RestaurantId::new(1),
            name: "Noodle Bar".to_string(),
        }
    }

    fn taco_truck() -> CartRestaurant {
        CartRestaurant {
            id: RestaurantId::new(2),
            name: "Taco Truck".to_string(),
        }
    }

    fn item(restaurant: CartRestaurant, id: i32, cents: i64, quantity: u32) -> AddItem {
        AddItem {
            restaurant,
            menu_item_id: MenuItemId::new(id),
            name: format!("item-{id}"),
            unit_price: Money::from_cents(cents),
            quantity,
        }
    }

    #[test]
    fn test_add_to_empty_cart_adopts_restaurant() {
        let mut cart = Cart::new();
        let outcome = cart
            .add_item(item(noodle_bar(), 10, 1200, 1), CartConflictPolicy::Keep)
            .unwrap();
        assert_eq!(outcome, AddOutcome::Appended);
        assert_eq!(cart.restaurant(), Some(&noodle_bar()));
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_add_same_item_increments() {
        let mut cart = Cart::new();
        cart.add_item(item(noodle_bar(), 10, 1200, 1), CartConflictPolicy::Keep)
            .unwrap();
        let outcome = cart
            .add_item(item(noodle_bar(), 10, 1200, 2), CartConflictPolicy::Keep)
            .unwrap();
        assert_eq!(outcome, AddOutcome::Incremented { quantity: 3 });
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.subtotal(), Money::from_cents(3600));
    }

    #[test]
    fn test_add_from_other_restaurant_without_confirmation_leaves_cart() {
        let mut cart = Cart::new();
        cart.add_item(item(noodle_bar(), 10, 1200, 1), CartConflictPolicy::Keep)
            .unwrap();
        let before = cart.clone();

        let err = cart
            .add_item(item(taco_truck(), 20, 300, 1), CartConflictPolicy::Keep)
            .unwrap_err();

        assert_eq!(
            err,
            CartError::DifferentRestaurant {
                current: noodle_bar()
            }
        );
        assert_eq!(cart, before);
    }

    #[test]
    fn test_add_from_other_restaurant_with_confirmation_replaces() {
        let mut cart = Cart::new();
        cart.add_item(item(noodle_bar(), 10, 1200, 2), CartConflictPolicy::Keep)
            .unwrap();
        cart.add_item(item(noodle_bar(), 11, 450, 1), CartConflictPolicy::Keep)
            .unwrap();

        let outcome = cart
            .add_item(item(taco_truck(), 20, 300, 3), CartConflictPolicy::Replace)
            .unwrap();

        assert_eq!(
            outcome,
            AddOutcome::Replaced {
                previous: noodle_bar()
            }
        );
        assert_eq!(cart.restaurant(), Some(&taco_truck()));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.subtotal(), Money::from_cents(900));
    }

    #[test]
    fn test_replace_policy_is_noop_for_same_restaurant() {
        let mut cart = Cart::new();
        cart.add_item(item(noodle_bar(), 10, 1200, 1), CartConflictPolicy::Replace)
            .unwrap();
        let outcome = cart
            .add_item(item(noodle_bar(), 11, 100, 1), CartConflictPolicy::Replace)
            .unwrap();
        assert_eq!(outcome, AddOutcome::Appended);
        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn test_quantity_limits() {
        let mut cart = Cart::new();
        assert_eq!(
            cart.add_item(item(noodle_bar(), 10, 100, 0), CartConflictPolicy::Keep),
            Err(CartError::ZeroQuantity)
        );
        cart.add_item(item(noodle_bar(), 10, 100, 98), CartConflictPolicy::Keep)
            .unwrap();
        assert_eq!(
            cart.add_item(item(noodle_bar(), 10, 100, 2), CartConflictPolicy::Keep),
            Err(CartError::QuantityLimit {
                max: MAX_LINE_QUANTITY
            })
        );
        assert_eq!(cart.item_count(), 98);
    }

    #[test]
    fn test_update_quantity_zero_removes_and_forgets_restaurant() {
        let mut cart = Cart::new();
        cart.add_item(item(noodle_bar(), 10, 1200, 1), CartConflictPolicy::Keep)
            .unwrap();
        cart.update_quantity(MenuItemId::new(10), 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.restaurant(), None);

        // A fresh restaurant can now be added without confirmation
        cart.add_item(item(taco_truck(), 20, 300, 1), CartConflictPolicy::Keep)
            .unwrap();
        assert_eq!(cart.restaurant(), Some(&taco_truck()));
    }

    #[test]
    fn test_update_missing_item() {
        let mut cart = Cart::new();
        assert_eq!(
            cart.update_quantity(MenuItemId::new(5), 2),
            Err(CartError::ItemNotInCart(MenuItemId::new(5)))
        );
    }

    #[test]
    fn test_subtotal_matches_lines_after_mixed_operations() {
        let mut cart = Cart::new();
        cart.add_item(item(noodle_bar(), 1, 999, 2), CartConflictPolicy::Keep)
            .unwrap();
        cart.add_item(item(noodle_bar(), 2, 350, 1), CartConflictPolicy::Keep)
            .unwrap();
        cart.add_item(item(noodle_bar(), 3, 1275, 4), CartConflictPolicy::Keep)
            .unwrap();
        cart.update_quantity(MenuItemId::new(2), 3).unwrap();
        cart.remove_item(MenuItemId::new(1)).unwrap();

        let expected: Money = cart
            .items()
            .iter()
            .map(|l| l.unit_price.times(l.quantity))
            .sum();
        assert_eq!(cart.subtotal(), expected);
        assert_eq!(cart.subtotal(), Money::from_cents(350 * 3 + 1275 * 4));
    }

    #[test]
    fn test_reprice_reports_changes() {
        let mut cart = Cart::new();
        cart.add_item(item(noodle_bar(), 1, 1000, 1), CartConflictPolicy::Keep)
            .unwrap();
        cart.add_item(item(noodle_bar(), 2, 500, 2), CartConflictPolicy::Keep)
            .unwrap();

        let prices = HashMap::from([
            (MenuItemId::new(1), Money::from_cents(1000)),
            (MenuItemId::new(2), Money::from_cents(550)),
        ]);
        let changes = cart.reprice(&prices).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(cart.subtotal(), Money::from_cents(2100));
    }

    #[test]
    fn test_reprice_missing_item_leaves_cart() {
        let mut cart = Cart::new();
        cart.add_item(item(noodle_bar(), 1, 1000, 1), CartConflictPolicy::Keep)
            .unwrap();
        let before = cart.clone();
        let err = cart.reprice(&HashMap::new()).unwrap_err();
        assert_eq!(err, CartError::ItemUnavailable(MenuItemId::new(1)));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_cart_json_roundtrip_preserves_restaurant() {
        let mut cart = Cart::new();
        cart.add_item(item(taco_truck(), 7, 250, 2), CartConflictPolicy::Keep)
            .unwrap();
        let json = serde_json::to_value(&cart).unwrap();
        let restored: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(restored, cart);
    }
}
