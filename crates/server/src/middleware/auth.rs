//! Bearer-token authentication extractors.
//!
//! Each extractor resolves the `Authorization: Bearer` token once per request
//! (cached in the request extensions) and then checks the role:
//!
//! | Extractor            | Requires                                   |
//! |----------------------|--------------------------------------------|
//! | [`Authenticated`]    | any valid token                            |
//! | [`CustomerAuth`]     | customer                                   |
//! | [`ApprovedRestaurant`] | restaurant with `ACCEPTED` approval      |
//! | [`ApprovedCourier`]  | courier with `ACCEPTED` approval           |
//! | [`AdminAuth`]        | any admin, viewers included                |
//! | [`ModeratorAuth`]    | admin allowed to change data               |
//!
//! Missing or invalid tokens reject with 401, wrong roles with 403.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use gobble_core::{AccountRole, AdminUserId, CourierId, CustomerId, RestaurantId};

use crate::error::{AppError, set_sentry_user};
use crate::models::Principal;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Any authenticated account.
///
/// # Example
///
/// ```rust,ignore
/// async fn session(Authenticated(principal): Authenticated) -> Json<SessionInfo> {
///     Json(principal.session_info())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

/// An authenticated customer.
#[derive(Debug, Clone)]
pub struct CustomerAuth(pub Principal);

/// A restaurant whose account has been approved.
#[derive(Debug, Clone)]
pub struct ApprovedRestaurant(pub Principal);

/// A courier whose account has been approved.
#[derive(Debug, Clone)]
pub struct ApprovedCourier(pub Principal);

/// Any admin user, including read-only viewers.
#[derive(Debug, Clone)]
pub struct AdminAuth(pub Principal);

/// An admin user allowed to make changes.
#[derive(Debug, Clone)]
pub struct ModeratorAuth(pub Principal);

impl CustomerAuth {
    #[must_use]
    pub const fn id(&self) -> CustomerId {
        self.0.customer_id()
    }
}

impl ApprovedRestaurant {
    #[must_use]
    pub const fn id(&self) -> RestaurantId {
        self.0.restaurant_id()
    }
}

impl ApprovedCourier {
    #[must_use]
    pub const fn id(&self) -> CourierId {
        self.0.courier_id()
    }
}

impl ModeratorAuth {
    #[must_use]
    pub const fn id(&self) -> AdminUserId {
        self.0.admin_id()
    }
}

/// The raw token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

async fn resolve(parts: &mut Parts, state: &AppState) -> Result<Principal, AppError> {
    if let Some(principal) = parts.extensions.get::<Principal>() {
        return Ok(principal.clone());
    }

    let token = bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;
    let principal = AuthService::new(state.pool(), state.config())
        .authenticate(token)
        .await?;

    set_sentry_user(&principal.account, Some(&principal.email));
    parts.extensions.insert(principal.clone());
    Ok(principal)
}

fn require_role(principal: &Principal, role: AccountRole) -> Result<(), AppError> {
    if principal.role() == role {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("{role} account required")))
    }
}

fn require_approved(principal: &Principal, role: AccountRole) -> Result<(), AppError> {
    require_role(principal, role)?;
    if principal.approval_status.is_some_and(|s| s.is_accepted()) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "account is awaiting approval".to_string(),
        ))
    }
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        resolve(parts, state).await.map(Self)
    }
}

impl FromRequestParts<AppState> for CustomerAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let principal = resolve(parts, state).await?;
        require_role(&principal, AccountRole::Customer)?;
        Ok(Self(principal))
    }
}

impl FromRequestParts<AppState> for ApprovedRestaurant {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let principal = resolve(parts, state).await?;
        require_approved(&principal, AccountRole::Restaurant)?;
        Ok(Self(principal))
    }
}

impl FromRequestParts<AppState> for ApprovedCourier {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let principal = resolve(parts, state).await?;
        require_approved(&principal, AccountRole::Courier)?;
        Ok(Self(principal))
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let principal = resolve(parts, state).await?;
        require_role(&principal, AccountRole::Admin)?;
        Ok(Self(principal))
    }
}

impl FromRequestParts<AppState> for ModeratorAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let principal = resolve(parts, state).await?;
        require_role(&principal, AccountRole::Admin)?;
        if !principal.admin_role.is_some_and(|r| r.can_moderate()) {
            return Err(AppError::Forbidden(
                "viewers have read-only access".to_string(),
            ));
        }
        Ok(Self(principal))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;
    use chrono::Utc;
    use gobble_core::{AccountRef, ApprovalStatus};

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn principal(role: AccountRole, approval: Option<ApprovalStatus>) -> Principal {
        Principal {
            token_id: 1,
            account: AccountRef::new(role, 3),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            approval_status: approval,
            admin_role: None,
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc123")), Some("abc123"));
        assert_eq!(bearer_token(&headers("bearer abc123")), Some("abc123"));
        assert_eq!(bearer_token(&headers("Basic abc123")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_pending_restaurant_is_forbidden() {
        let pending = principal(AccountRole::Restaurant, Some(ApprovalStatus::Pending));
        assert!(matches!(
            require_approved(&pending, AccountRole::Restaurant),
            Err(AppError::Forbidden(_))
        ));

        let accepted = principal(AccountRole::Restaurant, Some(ApprovalStatus::Accepted));
        assert!(require_approved(&accepted, AccountRole::Restaurant).is_ok());
        assert!(require_approved(&accepted, AccountRole::Courier).is_err());
    }

    #[test]
    fn test_role_mismatch() {
        let customer = principal(AccountRole::Customer, None);
        assert!(require_role(&customer, AccountRole::Customer).is_ok());
        assert!(matches!(
            require_role(&customer, AccountRole::Admin),
            Err(AppError::Forbidden(_))
        ));
    }
}
