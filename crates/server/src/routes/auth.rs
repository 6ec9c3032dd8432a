//! Registration, login, and session routes.

use axum::{Json, extract::State, http::StatusCode};
use gobble_core::api::{
    LoginRequest, LoginResponse, RegisterCourier, RegisterCustomer, RegisterRestaurant, Registered,
    SessionInfo,
};
use tracing::instrument;

use crate::error::{Result, clear_sentry_user};
use crate::middleware::Authenticated;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Register a customer.
///
/// POST /api/auth/register/customer
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn register_customer(
    State(state): State<AppState>,
    Json(req): Json<RegisterCustomer>,
) -> Result<(StatusCode, Json<Registered>)> {
    let registered = AuthService::new(state.pool(), state.config())
        .register_customer(&req)
        .await?;
    Ok((StatusCode::CREATED, Json(registered)))
}

/// Register a restaurant. The account starts out pending approval.
///
/// POST /api/auth/register/restaurant
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn register_restaurant(
    State(state): State<AppState>,
    Json(req): Json<RegisterRestaurant>,
) -> Result<(StatusCode, Json<Registered>)> {
    let registered = AuthService::new(state.pool(), state.config())
        .register_restaurant(&req)
        .await?;
    Ok((StatusCode::CREATED, Json(registered)))
}

/// Register a courier. The account starts out pending approval.
///
/// POST /api/auth/register/courier
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn register_courier(
    State(state): State<AppState>,
    Json(req): Json<RegisterCourier>,
) -> Result<(StatusCode, Json<Registered>)> {
    let registered = AuthService::new(state.pool(), state.config())
        .register_courier(&req)
        .await?;
    Ok((StatusCode::CREATED, Json(registered)))
}

/// Exchange credentials for a bearer token.
///
/// POST /api/auth/login
#[instrument(skip(state, req), fields(role = %req.role, email = %req.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let response = AuthService::new(state.pool(), state.config())
        .login(&req)
        .await?;
    Ok(Json(response))
}

/// Revoke the token used for this request.
///
/// POST /api/auth/logout
#[instrument(skip(state, principal), fields(account = %principal.account))]
pub async fn logout(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<StatusCode> {
    AuthService::new(state.pool(), state.config())
        .logout(&principal)
        .await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// Who the token belongs to. Doubles as the client's liveness check.
///
/// GET /api/auth/session
pub async fn session(Authenticated(principal): Authenticated) -> Json<SessionInfo> {
    Json(principal.session_info())
}
