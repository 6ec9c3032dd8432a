//! Business logic on top of the repositories.
//!
//! Services own the multi-step operations (checkout, order lifecycle,
//! dispatch, moderation) and the rules the HTTP layer must not bypass.

pub mod auth;
pub mod cart;
pub mod catalogue;
pub mod checkout;
pub mod dispatch;
pub mod moderation;
pub mod notify;
pub mod orders;

use gobble_core::GeoPoint;

/// Reject blank free-text fields.
pub(crate) fn check_required(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} is required"));
    }
    Ok(())
}

/// Re-validate coordinates that arrived through deserialization.
pub(crate) fn check_location(location: &GeoPoint) -> Result<(), String> {
    GeoPoint::new(location.latitude, location.longitude)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

pub(crate) fn check_radius(radius_km: f64) -> Result<(), String> {
    if radius_km.is_finite() && radius_km > 0.0 {
        Ok(())
    } else {
        Err("delivery radius must be a positive number of kilometres".to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_location() {
        let ok = GeoPoint {
            latitude: 51.5,
            longitude: -0.12,
        };
        assert!(check_location(&ok).is_ok());

        let bad = GeoPoint {
            latitude: 0.0,
            longitude: 200.0,
        };
        assert!(check_location(&bad).is_err());
    }

    #[test]
    fn test_check_radius() {
        assert!(check_radius(0.5).is_ok());
        assert!(check_radius(-1.0).is_err());
        assert!(check_radius(f64::INFINITY).is_err());
    }
}
