//! Admin console API.
//!
//! Reads are open to every admin role; changes need a moderator or super
//! admin (viewers get 403).

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use gobble_core::api::{
    AccountListQuery, AccountSummary, ApprovalUpdate, BanListQuery, CouponInput, CouponView,
    CreateBanRequest, DashboardStats, PromotionInput, PromotionView,
};
use gobble_core::listing::Page;
use gobble_core::moderation::Ban;
use gobble_core::pricing::normalize_coupon_code;
use gobble_core::{AccountRef, AccountRole, BanId, CouponId, PromotionId};
use tracing::{info, instrument};

use super::{not_found, validate_promotion};
use crate::db::{
    AccountRepository, BanRepository, CouponRepository, PromotionRepository, RestaurantRepository,
    StatsRepository,
};
use crate::error::{AppError, Result};
use crate::middleware::{AdminAuth, ModeratorAuth};
use crate::services::moderation::ModerationService;
use crate::state::AppState;

fn validate_coupon(input: &CouponInput) -> Result<()> {
    if normalize_coupon_code(&input.code).is_empty() {
        return Err(AppError::BadRequest("code is required".to_owned()));
    }
    if input.amount.is_zero() {
        return Err(AppError::BadRequest("amount must be positive".to_owned()));
    }
    if input.max_uses.is_some_and(|max| max < 1) {
        return Err(AppError::BadRequest(
            "max uses must be at least 1".to_owned(),
        ));
    }
    Ok(())
}

// =============================================================================
// Dashboard and accounts
// =============================================================================

/// GET /api/admin/dashboard
#[instrument(skip(state, _admin))]
pub async fn dashboard(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<DashboardStats>> {
    let stats = StatsRepository::new(state.pool()).dashboard().await?;
    Ok(Json(stats))
}

/// Accounts of one role, searchable, sortable, and paginated.
///
/// GET /api/admin/accounts/{role}
#[instrument(skip(state, _admin))]
pub async fn accounts(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(role): Path<AccountRole>,
    Query(query): Query<AccountListQuery>,
) -> Result<Json<Page<AccountSummary>>> {
    let page = AccountRepository::new(state.pool())
        .list(role, &query)
        .await?;
    Ok(Json(page))
}

/// Approve or reject a restaurant or courier.
///
/// PUT /api/admin/accounts/{role}/{id}/approval
#[instrument(skip(state, admin), fields(admin_id = %admin.id()))]
pub async fn set_approval(
    State(state): State<AppState>,
    admin: ModeratorAuth,
    Path((role, id)): Path<(AccountRole, i32)>,
    Json(req): Json<ApprovalUpdate>,
) -> Result<StatusCode> {
    ModerationService::new(state.pool(), state.menu_cache())
        .set_approval(AccountRef::new(role, id), req.status)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Bans
// =============================================================================

/// GET /api/admin/bans
#[instrument(skip(state, _admin))]
pub async fn bans(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Query(query): Query<BanListQuery>,
) -> Result<Json<Page<Ban>>> {
    let page = BanRepository::new(state.pool()).list(&query).await?;
    Ok(Json(page))
}

/// Ban an account for a fixed number of days or permanently.
///
/// POST /api/admin/bans
#[instrument(skip(state, admin, req), fields(admin_id = %admin.id(), target = %req.target))]
pub async fn create_ban(
    State(state): State<AppState>,
    admin: ModeratorAuth,
    Json(req): Json<CreateBanRequest>,
) -> Result<(StatusCode, Json<Ban>)> {
    let ban = ModerationService::new(state.pool(), state.menu_cache())
        .ban(admin.id(), &req)
        .await?;
    Ok((StatusCode::CREATED, Json(ban)))
}

/// POST /api/admin/bans/{id}/lift
#[instrument(skip(state, admin), fields(admin_id = %admin.id()))]
pub async fn lift_ban(
    State(state): State<AppState>,
    admin: ModeratorAuth,
    Path(id): Path<BanId>,
) -> Result<Json<Ban>> {
    let ban = ModerationService::new(state.pool(), state.menu_cache())
        .lift(id)
        .await?;
    Ok(Json(ban))
}

// =============================================================================
// Coupons
// =============================================================================

/// GET /api/admin/coupons
#[instrument(skip(state, _admin))]
pub async fn coupons(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<Vec<CouponView>>> {
    let coupons = CouponRepository::new(state.pool()).list().await?;
    Ok(Json(coupons.iter().map(Into::into).collect()))
}

/// POST /api/admin/coupons
#[instrument(skip(state, admin, req), fields(admin_id = %admin.id()))]
pub async fn create_coupon(
    State(state): State<AppState>,
    admin: ModeratorAuth,
    Json(req): Json<CouponInput>,
) -> Result<(StatusCode, Json<CouponView>)> {
    validate_coupon(&req)?;
    let coupon = CouponRepository::new(state.pool()).create(&req).await?;
    info!(coupon_id = %coupon.id, code = %coupon.code, "Coupon created");
    Ok((StatusCode::CREATED, Json(CouponView::from(&coupon))))
}

/// PUT /api/admin/coupons/{id}
#[instrument(skip(state, admin, req), fields(admin_id = %admin.id()))]
pub async fn update_coupon(
    State(state): State<AppState>,
    admin: ModeratorAuth,
    Path(id): Path<CouponId>,
    Json(req): Json<CouponInput>,
) -> Result<Json<CouponView>> {
    validate_coupon(&req)?;
    let coupon = CouponRepository::new(state.pool())
        .update(id, &req)
        .await
        .map_err(not_found("Coupon"))?;
    Ok(Json(CouponView::from(&coupon)))
}

/// DELETE /api/admin/coupons/{id}
#[instrument(skip(state, admin), fields(admin_id = %admin.id()))]
pub async fn delete_coupon(
    State(state): State<AppState>,
    admin: ModeratorAuth,
    Path(id): Path<CouponId>,
) -> Result<StatusCode> {
    CouponRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(not_found("Coupon"))?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Promotions
// =============================================================================

/// Every promotion, platform-wide and per restaurant.
///
/// GET /api/admin/promotions
#[instrument(skip(state, _admin))]
pub async fn promotions(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<Vec<PromotionView>>> {
    let promotions = PromotionRepository::new(state.pool()).list(None).await?;
    Ok(Json(promotions.iter().map(Into::into).collect()))
}

async fn check_promotion_target(state: &AppState, input: &PromotionInput) -> Result<()> {
    validate_promotion(input)?;
    if let Some(restaurant_id) = input.restaurant_id
        && RestaurantRepository::new(state.pool())
            .get(restaurant_id)
            .await?
            .is_none()
    {
        return Err(AppError::BadRequest(format!(
            "restaurant {restaurant_id} does not exist"
        )));
    }
    Ok(())
}

/// POST /api/admin/promotions
#[instrument(skip(state, admin, req), fields(admin_id = %admin.id()))]
pub async fn create_promotion(
    State(state): State<AppState>,
    admin: ModeratorAuth,
    Json(req): Json<PromotionInput>,
) -> Result<(StatusCode, Json<PromotionView>)> {
    check_promotion_target(&state, &req).await?;
    let promotion = PromotionRepository::new(state.pool()).create(&req).await?;
    Ok((StatusCode::CREATED, Json(PromotionView::from(&promotion))))
}

/// PUT /api/admin/promotions/{id}
#[instrument(skip(state, admin, req), fields(admin_id = %admin.id()))]
pub async fn update_promotion(
    State(state): State<AppState>,
    admin: ModeratorAuth,
    Path(id): Path<PromotionId>,
    Json(req): Json<PromotionInput>,
) -> Result<Json<PromotionView>> {
    check_promotion_target(&state, &req).await?;
    let promotion = PromotionRepository::new(state.pool())
        .update(id, None, &req)
        .await
        .map_err(not_found("Promotion"))?;
    Ok(Json(PromotionView::from(&promotion)))
}

/// DELETE /api/admin/promotions/{id}
#[instrument(skip(state, admin), fields(admin_id = %admin.id()))]
pub async fn delete_promotion(
    State(state): State<AppState>,
    admin: ModeratorAuth,
    Path(id): Path<PromotionId>,
) -> Result<StatusCode> {
    PromotionRepository::new(state.pool())
        .delete(id, None)
        .await
        .map_err(not_found("Promotion"))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use gobble_core::Money;

    use super::*;

    fn coupon() -> CouponInput {
        CouponInput {
            code: "welcome5".to_owned(),
            amount: Money::from_cents(500),
            min_subtotal: Money::from_cents(1500),
            max_uses: Some(100),
            expires_at: None,
            is_active: true,
        }
    }

    #[test]
    fn test_coupon_validation() {
        assert!(validate_coupon(&coupon()).is_ok());

        let mut blank = coupon();
        blank.code = "  ".to_owned();
        assert!(validate_coupon(&blank).is_err());

        let mut free = coupon();
        free.amount = Money::ZERO;
        assert!(validate_coupon(&free).is_err());

        let mut unusable = coupon();
        unusable.max_uses = Some(0);
        assert!(validate_coupon(&unusable).is_err());

        let mut unlimited = coupon();
        unlimited.max_uses = None;
        assert!(validate_coupon(&unlimited).is_ok());
    }
}
