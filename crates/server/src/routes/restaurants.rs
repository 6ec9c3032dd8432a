//! Public restaurant browsing.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use gobble_core::RestaurantId;
use gobble_core::api::{PromotionView, RestaurantDetail, RestaurantSearch, RestaurantView};
use gobble_core::listing::Page;
use tracing::instrument;

use crate::db::{PromotionRepository, RestaurantRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Search open restaurants by name and cuisine.
///
/// GET /api/restaurants
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(search): Query<RestaurantSearch>,
) -> Result<Json<Page<RestaurantView>>> {
    let page = RestaurantRepository::new(state.pool())
        .search(&search)
        .await?;
    Ok(Json(page.map(|r| RestaurantView::from(&r))))
}

/// A restaurant with its orderable menu.
///
/// GET /api/restaurants/{id}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<RestaurantId>,
) -> Result<Json<RestaurantDetail>> {
    let detail = state
        .menu_cache()
        .get_or_load(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("Restaurant not found".to_owned()))?;
    Ok(Json(RestaurantDetail::clone(&detail)))
}

/// Promotions currently usable at a restaurant, platform-wide ones included.
///
/// GET /api/restaurants/{id}/promotions
#[instrument(skip(state))]
pub async fn promotions(
    State(state): State<AppState>,
    Path(id): Path<RestaurantId>,
) -> Result<Json<Vec<PromotionView>>> {
    if RestaurantRepository::new(state.pool())
        .get_open(id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("Restaurant not found".to_owned()));
    }
    let promotions = PromotionRepository::new(state.pool())
        .live_for_restaurant(id)
        .await?;
    Ok(Json(promotions.iter().map(Into::into).collect()))
}
