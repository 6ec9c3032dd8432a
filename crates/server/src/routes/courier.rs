//! Courier portal: profile, availability, and deliveries.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use gobble_core::OrderId;
use gobble_core::api::{
    AvailabilityUpdate, CourierProfileInput, CourierView, OrderListQuery, OrderView,
};
use gobble_core::listing::Page;
use tracing::{info, instrument, warn};

use super::{check, not_found};
use crate::db::CourierRepository;
use crate::error::{AppError, Result};
use crate::middleware::ApprovedCourier;
use crate::services::dispatch::Dispatcher;
use crate::services::orders::OrderService;
use crate::services::{check_location, check_required};
use crate::state::AppState;

/// GET /api/courier/profile
#[instrument(skip(state, courier), fields(courier_id = %courier.id()))]
pub async fn profile(
    State(state): State<AppState>,
    courier: ApprovedCourier,
) -> Result<Json<CourierView>> {
    let profile = CourierRepository::new(state.pool())
        .get(courier.id())
        .await?
        .ok_or_else(|| AppError::NotFound("Courier not found".to_owned()))?;
    Ok(Json(CourierView::from(&profile)))
}

/// PUT /api/courier/profile
#[instrument(skip(state, courier, req), fields(courier_id = %courier.id()))]
pub async fn update_profile(
    State(state): State<AppState>,
    courier: ApprovedCourier,
    Json(req): Json<CourierProfileInput>,
) -> Result<Json<CourierView>> {
    check(check_required("name", &req.name))?;
    check(check_required("phone", &req.phone))?;
    check(check_required("vehicle", &req.vehicle))?;
    let profile = CourierRepository::new(state.pool())
        .update_profile(courier.id(), &req)
        .await
        .map_err(not_found("Courier"))?;
    Ok(Json(CourierView::from(&profile)))
}

/// Go on or off duty, optionally reporting a new location.
///
/// Coming on duty offers the courier the oldest ready order in range.
///
/// PUT /api/courier/availability
#[instrument(skip(state, courier), fields(courier_id = %courier.id()))]
pub async fn set_availability(
    State(state): State<AppState>,
    courier: ApprovedCourier,
    Json(req): Json<AvailabilityUpdate>,
) -> Result<Json<CourierView>> {
    if let Some(location) = &req.location {
        check(check_location(location))?;
    }
    let profile = CourierRepository::new(state.pool())
        .set_availability(courier.id(), req.is_available, req.location)
        .await
        .map_err(not_found("Courier"))?;
    info!(is_available = profile.is_available, "Courier availability changed");

    if profile.is_available && profile.location.is_some() {
        let dispatcher = Dispatcher::new(state.pool(), state.config().dispatch_radius_km);
        if let Err(e) = dispatcher.dispatch_to_courier(courier.id()).await {
            warn!(error = %e, "Dispatch to available courier failed");
        }
    }
    Ok(Json(CourierView::from(&profile)))
}

/// Ready or accepted orders nobody has claimed yet.
///
/// GET /api/courier/deliveries
#[instrument(skip(state, _courier))]
pub async fn deliveries(
    State(state): State<AppState>,
    _courier: ApprovedCourier,
) -> Result<Json<Vec<OrderView>>> {
    let orders = OrderService::new(state.pool(), state.config())
        .open_deliveries()
        .await?;
    Ok(Json(orders.iter().map(Into::into).collect()))
}

/// Orders assigned to this courier.
///
/// GET /api/courier/orders
#[instrument(skip(state, courier), fields(courier_id = %courier.id()))]
pub async fn orders(
    State(state): State<AppState>,
    courier: ApprovedCourier,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Page<OrderView>>> {
    let page = OrderService::new(state.pool(), state.config())
        .list_for(&courier.0, &query)
        .await?;
    Ok(Json(page.map(|o| OrderView::from(&o))))
}

/// Claim an open delivery. The first claim wins.
///
/// POST /api/courier/orders/{id}/claim
#[instrument(skip(state, courier), fields(courier_id = %courier.id()))]
pub async fn claim(
    State(state): State<AppState>,
    courier: ApprovedCourier,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let order = OrderService::new(state.pool(), state.config())
        .claim(courier.id(), id)
        .await?;
    Ok(Json(OrderView::from(&order)))
}

/// POST /api/courier/orders/{id}/pickup
#[instrument(skip(state, courier), fields(courier_id = %courier.id()))]
pub async fn pick_up(
    State(state): State<AppState>,
    courier: ApprovedCourier,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let order = OrderService::new(state.pool(), state.config())
        .pick_up(courier.id(), id)
        .await?;
    Ok(Json(OrderView::from(&order)))
}

/// POST /api/courier/orders/{id}/deliver
#[instrument(skip(state, courier), fields(courier_id = %courier.id()))]
pub async fn deliver(
    State(state): State<AppState>,
    courier: ApprovedCourier,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let order = OrderService::new(state.pool(), state.config())
        .deliver(courier.id(), id)
        .await?;
    Ok(Json(OrderView::from(&order)))
}
