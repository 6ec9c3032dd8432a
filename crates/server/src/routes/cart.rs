//! Customer cart routes.
//!
//! The cart is stored server-side per customer and returned whole after
//! every change.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use gobble_core::MenuItemId;
use gobble_core::api::{AddToCartRequest, CartView, UpdateCartItemRequest};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::CustomerAuth;
use crate::services::cart::CartService;
use crate::state::AppState;

/// GET /api/cart
#[instrument(skip(state, customer), fields(customer_id = %customer.id()))]
pub async fn show(State(state): State<AppState>, customer: CustomerAuth) -> Result<Json<CartView>> {
    let cart = CartService::new(state.pool()).get(customer.id()).await?;
    Ok(Json(CartView::from(&cart)))
}

/// Add an item. Items from a second restaurant are refused with
/// `cart_conflict` unless `replace_existing` is set.
///
/// POST /api/cart/items
#[instrument(skip(state, customer), fields(customer_id = %customer.id()))]
pub async fn add(
    State(state): State<AppState>,
    customer: CustomerAuth,
    Json(req): Json<AddToCartRequest>,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.pool())
        .add_item(customer.id(), &req)
        .await?;
    Ok(Json(CartView::from(&cart)))
}

/// PATCH /api/cart/items/{menu_item_id}
#[instrument(skip(state, customer), fields(customer_id = %customer.id()))]
pub async fn update(
    State(state): State<AppState>,
    customer: CustomerAuth,
    Path(menu_item_id): Path<MenuItemId>,
    Json(req): Json<UpdateCartItemRequest>,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.pool())
        .update_quantity(customer.id(), menu_item_id, req.quantity)
        .await?;
    Ok(Json(CartView::from(&cart)))
}

/// DELETE /api/cart/items/{menu_item_id}
#[instrument(skip(state, customer), fields(customer_id = %customer.id()))]
pub async fn remove(
    State(state): State<AppState>,
    customer: CustomerAuth,
    Path(menu_item_id): Path<MenuItemId>,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.pool())
        .remove_item(customer.id(), menu_item_id)
        .await?;
    Ok(Json(CartView::from(&cart)))
}

/// DELETE /api/cart
#[instrument(skip(state, customer), fields(customer_id = %customer.id()))]
pub async fn clear(State(state): State<AppState>, customer: CustomerAuth) -> Result<StatusCode> {
    CartService::new(state.pool()).clear(customer.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}
