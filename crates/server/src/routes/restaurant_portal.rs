//! Restaurant portal: profile, menu, incoming orders, own promotions.
//!
//! Every route needs an approved restaurant. Changes to the profile or menu
//! drop the cached public page.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use gobble_core::api::{
    MenuItemInput, MenuItemView, OrderListQuery, OrderView, PromotionInput, PromotionView,
    RejectOrderRequest, RestaurantProfileInput, RestaurantView,
};
use gobble_core::listing::Page;
use gobble_core::{MenuItemId, OrderId, PromotionId};
use tracing::{info, instrument};

use super::{check, not_found, validate_promotion};
use crate::db::{MenuRepository, PromotionRepository, RestaurantRepository};
use crate::error::{AppError, Result};
use crate::middleware::ApprovedRestaurant;
use crate::services::orders::OrderService;
use crate::services::{check_location, check_radius, check_required};
use crate::state::AppState;

fn validate_profile(input: &RestaurantProfileInput) -> Result<()> {
    check(check_required("name", &input.name))?;
    check(check_required("cuisine", &input.cuisine))?;
    check(check_required("phone", &input.phone))?;
    check(check_required("street", &input.street))?;
    check(check_required("city", &input.city))?;
    check(check_location(&input.location))?;
    check(check_radius(input.delivery_radius_km))
}

fn validate_menu_item(input: &MenuItemInput) -> Result<()> {
    check(check_required("name", &input.name))?;
    if input.price.is_zero() {
        return Err(AppError::BadRequest("price must be positive".to_owned()));
    }
    Ok(())
}

// =============================================================================
// Profile
// =============================================================================

/// GET /api/restaurant/profile
#[instrument(skip(state, restaurant), fields(restaurant_id = %restaurant.id()))]
pub async fn profile(
    State(state): State<AppState>,
    restaurant: ApprovedRestaurant,
) -> Result<Json<RestaurantView>> {
    let profile = RestaurantRepository::new(state.pool())
        .get(restaurant.id())
        .await?
        .ok_or_else(|| AppError::NotFound("Restaurant not found".to_owned()))?;
    Ok(Json(RestaurantView::from(&profile)))
}

/// PUT /api/restaurant/profile
#[instrument(skip(state, restaurant, req), fields(restaurant_id = %restaurant.id()))]
pub async fn update_profile(
    State(state): State<AppState>,
    restaurant: ApprovedRestaurant,
    Json(req): Json<RestaurantProfileInput>,
) -> Result<Json<RestaurantView>> {
    validate_profile(&req)?;
    let profile = RestaurantRepository::new(state.pool())
        .update_profile(restaurant.id(), &req)
        .await
        .map_err(not_found("Restaurant"))?;
    state.menu_cache().invalidate(restaurant.id()).await;
    info!("Restaurant profile updated");
    Ok(Json(RestaurantView::from(&profile)))
}

// =============================================================================
// Menu
// =============================================================================

/// The full menu, unavailable items included.
///
/// GET /api/restaurant/menu
#[instrument(skip(state, restaurant), fields(restaurant_id = %restaurant.id()))]
pub async fn menu(
    State(state): State<AppState>,
    restaurant: ApprovedRestaurant,
) -> Result<Json<Vec<MenuItemView>>> {
    let items = MenuRepository::new(state.pool())
        .list(restaurant.id())
        .await?;
    Ok(Json(items.iter().map(Into::into).collect()))
}

/// POST /api/restaurant/menu
#[instrument(skip(state, restaurant, req), fields(restaurant_id = %restaurant.id()))]
pub async fn create_menu_item(
    State(state): State<AppState>,
    restaurant: ApprovedRestaurant,
    Json(req): Json<MenuItemInput>,
) -> Result<(StatusCode, Json<MenuItemView>)> {
    validate_menu_item(&req)?;
    let item = MenuRepository::new(state.pool())
        .create(restaurant.id(), &req)
        .await?;
    state.menu_cache().invalidate(restaurant.id()).await;
    Ok((StatusCode::CREATED, Json(MenuItemView::from(&item))))
}

/// PUT /api/restaurant/menu/{id}
#[instrument(skip(state, restaurant, req), fields(restaurant_id = %restaurant.id()))]
pub async fn update_menu_item(
    State(state): State<AppState>,
    restaurant: ApprovedRestaurant,
    Path(id): Path<MenuItemId>,
    Json(req): Json<MenuItemInput>,
) -> Result<Json<MenuItemView>> {
    validate_menu_item(&req)?;
    let item = MenuRepository::new(state.pool())
        .update(restaurant.id(), id, &req)
        .await
        .map_err(not_found("Menu item"))?;
    state.menu_cache().invalidate(restaurant.id()).await;
    Ok(Json(MenuItemView::from(&item)))
}

/// DELETE /api/restaurant/menu/{id}
#[instrument(skip(state, restaurant), fields(restaurant_id = %restaurant.id()))]
pub async fn delete_menu_item(
    State(state): State<AppState>,
    restaurant: ApprovedRestaurant,
    Path(id): Path<MenuItemId>,
) -> Result<StatusCode> {
    MenuRepository::new(state.pool())
        .delete(restaurant.id(), id)
        .await
        .map_err(not_found("Menu item"))?;
    state.menu_cache().invalidate(restaurant.id()).await;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Orders
// =============================================================================

/// GET /api/restaurant/orders
#[instrument(skip(state, restaurant), fields(restaurant_id = %restaurant.id()))]
pub async fn orders(
    State(state): State<AppState>,
    restaurant: ApprovedRestaurant,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Page<OrderView>>> {
    let page = OrderService::new(state.pool(), state.config())
        .list_for(&restaurant.0, &query)
        .await?;
    Ok(Json(page.map(|o| OrderView::from(&o))))
}

/// POST /api/restaurant/orders/{id}/accept
#[instrument(skip(state, restaurant), fields(restaurant_id = %restaurant.id()))]
pub async fn accept(
    State(state): State<AppState>,
    restaurant: ApprovedRestaurant,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let order = OrderService::new(state.pool(), state.config())
        .accept(restaurant.id(), id)
        .await?;
    Ok(Json(OrderView::from(&order)))
}

/// POST /api/restaurant/orders/{id}/reject
#[instrument(skip(state, restaurant, req), fields(restaurant_id = %restaurant.id()))]
pub async fn reject(
    State(state): State<AppState>,
    restaurant: ApprovedRestaurant,
    Path(id): Path<OrderId>,
    Json(req): Json<RejectOrderRequest>,
) -> Result<Json<OrderView>> {
    let order = OrderService::new(state.pool(), state.config())
        .reject(restaurant.id(), id, req.reason.as_deref())
        .await?;
    Ok(Json(OrderView::from(&order)))
}

/// Mark an order ready for pickup and try to dispatch a courier.
///
/// POST /api/restaurant/orders/{id}/ready
#[instrument(skip(state, restaurant), fields(restaurant_id = %restaurant.id()))]
pub async fn ready(
    State(state): State<AppState>,
    restaurant: ApprovedRestaurant,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let order = OrderService::new(state.pool(), state.config())
        .mark_ready(restaurant.id(), id)
        .await?;
    Ok(Json(OrderView::from(&order)))
}

// =============================================================================
// Promotions
// =============================================================================

/// The restaurant's own promotions, live or not.
///
/// GET /api/restaurant/promotions
#[instrument(skip(state, restaurant), fields(restaurant_id = %restaurant.id()))]
pub async fn promotions(
    State(state): State<AppState>,
    restaurant: ApprovedRestaurant,
) -> Result<Json<Vec<PromotionView>>> {
    let promotions = PromotionRepository::new(state.pool())
        .list(Some(restaurant.id()))
        .await?;
    Ok(Json(promotions.iter().map(Into::into).collect()))
}

/// POST /api/restaurant/promotions
#[instrument(skip(state, restaurant, req), fields(restaurant_id = %restaurant.id()))]
pub async fn create_promotion(
    State(state): State<AppState>,
    restaurant: ApprovedRestaurant,
    Json(mut req): Json<PromotionInput>,
) -> Result<(StatusCode, Json<PromotionView>)> {
    req.restaurant_id = Some(restaurant.id());
    validate_promotion(&req)?;
    let promotion = PromotionRepository::new(state.pool()).create(&req).await?;
    Ok((StatusCode::CREATED, Json(PromotionView::from(&promotion))))
}

/// PUT /api/restaurant/promotions/{id}
#[instrument(skip(state, restaurant, req), fields(restaurant_id = %restaurant.id()))]
pub async fn update_promotion(
    State(state): State<AppState>,
    restaurant: ApprovedRestaurant,
    Path(id): Path<PromotionId>,
    Json(mut req): Json<PromotionInput>,
) -> Result<Json<PromotionView>> {
    req.restaurant_id = Some(restaurant.id());
    validate_promotion(&req)?;
    let promotion = PromotionRepository::new(state.pool())
        .update(id, Some(restaurant.id()), &req)
        .await
        .map_err(not_found("Promotion"))?;
    Ok(Json(PromotionView::from(&promotion)))
}

/// DELETE /api/restaurant/promotions/{id}
#[instrument(skip(state, restaurant), fields(restaurant_id = %restaurant.id()))]
pub async fn delete_promotion(
    State(state): State<AppState>,
    restaurant: ApprovedRestaurant,
    Path(id): Path<PromotionId>,
) -> Result<StatusCode> {
    PromotionRepository::new(state.pool())
        .delete(id, Some(restaurant.id()))
        .await
        .map_err(not_found("Promotion"))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use gobble_core::{GeoPoint, Money};

    use super::*;

    fn profile_input() -> RestaurantProfileInput {
        RestaurantProfileInput {
            name: "Thai Basil".to_owned(),
            description: String::new(),
            cuisine: "Thai".to_owned(),
            phone: "020 7946 0000".to_owned(),
            street: "12 Market Row".to_owned(),
            city: "London".to_owned(),
            location: GeoPoint {
                latitude: 51.46,
                longitude: -0.11,
            },
            delivery_radius_km: 5.0,
        }
    }

    #[test]
    fn test_profile_requires_positive_radius() {
        assert!(validate_profile(&profile_input()).is_ok());

        let mut input = profile_input();
        input.delivery_radius_km = 0.0;
        assert!(validate_profile(&input).is_err());

        input.delivery_radius_km = f64::NAN;
        assert!(validate_profile(&input).is_err());
    }

    #[test]
    fn test_profile_description_is_optional() {
        let input = profile_input();
        assert!(input.description.is_empty());
        assert!(validate_profile(&input).is_ok());
    }

    #[test]
    fn test_menu_item_needs_name_and_price() {
        let mut input = MenuItemInput {
            name: "Green curry".to_owned(),
            description: String::new(),
            category: "Mains".to_owned(),
            price: Money::from_cents(1150),
            is_available: true,
        };
        assert!(validate_menu_item(&input).is_ok());

        input.price = Money::ZERO;
        assert!(validate_menu_item(&input).is_err());

        input.price = Money::from_cents(1150);
        input.name = String::new();
        assert!(validate_menu_item(&input).is_err());
    }
}
