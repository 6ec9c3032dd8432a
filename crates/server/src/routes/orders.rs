//! Checkout and order routes shared by every role.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use gobble_core::OrderId;
use gobble_core::api::{
    CouponValidation, OrderListQuery, OrderView, PlaceOrderRequest, QuoteRequest, QuoteResponse,
    ValidateCouponRequest,
};
use gobble_core::listing::Page;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::{Authenticated, CustomerAuth};
use crate::services::checkout::CheckoutService;
use crate::services::orders::OrderService;
use crate::state::AppState;

/// Price the cart for delivery to one of the customer's addresses.
///
/// POST /api/checkout/quote
#[instrument(skip(state, customer), fields(customer_id = %customer.id()))]
pub async fn quote(
    State(state): State<AppState>,
    customer: CustomerAuth,
    Json(req): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>> {
    let quote = CheckoutService::new(state.pool(), state.config())
        .quote(customer.id(), &req)
        .await?;
    Ok(Json(quote))
}

/// POST /api/coupons/validate
#[instrument(skip(state, _customer))]
pub async fn validate_coupon(
    State(state): State<AppState>,
    _customer: CustomerAuth,
    Json(req): Json<ValidateCouponRequest>,
) -> Result<Json<CouponValidation>> {
    let validation = CheckoutService::new(state.pool(), state.config())
        .validate_coupon(&req)
        .await?;
    Ok(Json(validation))
}

/// Place the cart as an order.
///
/// Returns 201 for a new order and 200 when the idempotency key was already
/// used, with the order from the first attempt.
///
/// POST /api/orders
#[instrument(skip(state, customer), fields(customer_id = %customer.id()))]
pub async fn place(
    State(state): State<AppState>,
    customer: CustomerAuth,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderView>)> {
    let (order, created) = CheckoutService::new(state.pool(), state.config())
        .place_order(customer.id(), &req)
        .await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(OrderView::from(&order))))
}

/// The caller's orders: placed, received, delivered, or all for admins.
///
/// GET /api/orders
#[instrument(skip(state, principal), fields(account = %principal.account))]
pub async fn index(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Page<OrderView>>> {
    let page = OrderService::new(state.pool(), state.config())
        .list_for(&principal, &query)
        .await?;
    Ok(Json(page.map(|o| OrderView::from(&o))))
}

/// GET /api/orders/{id}
#[instrument(skip(state, principal), fields(account = %principal.account))]
pub async fn show(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let order = OrderService::new(state.pool(), state.config())
        .get_for(&principal, id)
        .await?;
    Ok(Json(OrderView::from(&order)))
}

/// Cancel an order the restaurant has not accepted yet.
///
/// POST /api/orders/{id}/cancel
#[instrument(skip(state, customer), fields(customer_id = %customer.id()))]
pub async fn cancel(
    State(state): State<AppState>,
    customer: CustomerAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let order = OrderService::new(state.pool(), state.config())
        .cancel(customer.id(), id)
        .await?;
    Ok(Json(OrderView::from(&order)))
}
