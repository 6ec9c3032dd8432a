//! Customer address book.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use gobble_core::AddressId;
use gobble_core::api::{AddressInput, AddressView};
use tracing::instrument;

use super::{check, not_found};
use crate::db::AddressRepository;
use crate::error::Result;
use crate::middleware::CustomerAuth;
use crate::services::{check_location, check_required};
use crate::state::AppState;

fn validate(input: &AddressInput) -> Result<()> {
    check(check_required("label", &input.label))?;
    check(check_required("street", &input.street))?;
    check(check_required("city", &input.city))?;
    check(check_location(&input.location))
}

/// GET /api/addresses
#[instrument(skip(state, customer), fields(customer_id = %customer.id()))]
pub async fn index(
    State(state): State<AppState>,
    customer: CustomerAuth,
) -> Result<Json<Vec<AddressView>>> {
    let addresses = AddressRepository::new(state.pool())
        .list(customer.id())
        .await?;
    Ok(Json(addresses.iter().map(Into::into).collect()))
}

/// Add an address. The first one becomes the default.
///
/// POST /api/addresses
#[instrument(skip(state, customer, req), fields(customer_id = %customer.id()))]
pub async fn create(
    State(state): State<AppState>,
    customer: CustomerAuth,
    Json(req): Json<AddressInput>,
) -> Result<(StatusCode, Json<AddressView>)> {
    validate(&req)?;
    let address = AddressRepository::new(state.pool())
        .create(customer.id(), &req)
        .await?;
    Ok((StatusCode::CREATED, Json(AddressView::from(&address))))
}

/// PUT /api/addresses/{id}
#[instrument(skip(state, customer, req), fields(customer_id = %customer.id()))]
pub async fn update(
    State(state): State<AppState>,
    customer: CustomerAuth,
    Path(id): Path<AddressId>,
    Json(req): Json<AddressInput>,
) -> Result<Json<AddressView>> {
    validate(&req)?;
    let address = AddressRepository::new(state.pool())
        .update(customer.id(), id, &req)
        .await
        .map_err(not_found("Address"))?;
    Ok(Json(AddressView::from(&address)))
}

/// POST /api/addresses/{id}/default
#[instrument(skip(state, customer), fields(customer_id = %customer.id()))]
pub async fn set_default(
    State(state): State<AppState>,
    customer: CustomerAuth,
    Path(id): Path<AddressId>,
) -> Result<Json<AddressView>> {
    let address = AddressRepository::new(state.pool())
        .set_default(customer.id(), id)
        .await
        .map_err(not_found("Address"))?;
    Ok(Json(AddressView::from(&address)))
}

/// Delete an address. Past orders keep their own copy of it.
///
/// DELETE /api/addresses/{id}
#[instrument(skip(state, customer), fields(customer_id = %customer.id()))]
pub async fn destroy(
    State(state): State<AppState>,
    customer: CustomerAuth,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    AddressRepository::new(state.pool())
        .delete(customer.id(), id)
        .await
        .map_err(not_found("Address"))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use gobble_core::GeoPoint;

    use super::*;
    use crate::error::AppError;

    fn input() -> AddressInput {
        AddressInput {
            label: "Home".to_owned(),
            street: "1 High Street".to_owned(),
            city: "London".to_owned(),
            postal_code: "N1 1AA".to_owned(),
            location: GeoPoint {
                latitude: 51.53,
                longitude: -0.1,
            },
            is_default: false,
        }
    }

    #[test]
    fn test_validate_accepts_complete_address() {
        assert!(validate(&input()).is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_street() {
        let mut address = input();
        address.street = "   ".to_owned();
        assert!(matches!(validate(&address), Err(AppError::BadRequest(msg)) if msg == "street is required"));
    }

    #[test]
    fn test_validate_rejects_bad_coordinates() {
        let mut address = input();
        address.location.latitude = 91.0;
        assert!(matches!(validate(&address), Err(AppError::BadRequest(_))));
    }
}
