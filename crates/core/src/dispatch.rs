//! Courier assignment.

use serde::{Deserialize, Serialize};

use crate::types::{CourierId, GeoPoint};

/// A courier that might take a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CourierCandidate {
    pub id: CourierId,
    pub location: GeoPoint,
    pub is_available: bool,
}

/// The courier chosen for a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub courier_id: CourierId,
    pub distance_km: f64,
}

/// Pick the closest available courier within `max_km` of `origin`.
///
/// Equal distances resolve to the lowest courier id so repeated runs over the
/// same input agree.
#[must_use]
pub fn nearest_courier(
    origin: &GeoPoint,
    candidates: &[CourierCandidate],
    max_km: f64,
) -> Option<Assignment> {
    candidates
        .iter()
        .filter(|c| c.is_available)
        .map(|c| Assignment {
            courier_id: c.id,
            distance_km: origin.distance_km(&c.location),
        })
        .filter(|a| a.distance_km <= max_km)
        .min_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.courier_id.cmp(&b.courier_id))
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn candidate(id: i32, lat: f64, lng: f64, is_available: bool) -> CourierCandidate {
        CourierCandidate {
            id: CourierId::new(id),
            location: GeoPoint::new(lat, lng).unwrap(),
            is_available,
        }
    }

    fn origin() -> GeoPoint {
        GeoPoint::new(51.5074, -0.1278).unwrap()
    }

    #[test]
    fn test_picks_closest() {
        let couriers = [
            candidate(1, 51.52, -0.10, true),
            candidate(2, 51.508, -0.128, true),
            candidate(3, 51.60, -0.20, true),
        ];
        let chosen = nearest_courier(&origin(), &couriers, 10.0).unwrap();
        assert_eq!(chosen.courier_id, CourierId::new(2));
    }

    #[test]
    fn test_skips_unavailable() {
        let couriers = [
            candidate(1, 51.5074, -0.1278, false),
            candidate(2, 51.52, -0.10, true),
        ];
        let chosen = nearest_courier(&origin(), &couriers, 10.0).unwrap();
        assert_eq!(chosen.courier_id, CourierId::new(2));
    }

    #[test]
    fn test_respects_radius() {
        let couriers = [candidate(1, 52.2053, 0.1218, true)];
        assert!(nearest_courier(&origin(), &couriers, 10.0).is_none());
    }

    #[test]
    fn test_tie_goes_to_lowest_id() {
        let couriers = [
            candidate(7, 51.51, -0.12, true),
            candidate(4, 51.51, -0.12, true),
        ];
        let chosen = nearest_courier(&origin(), &couriers, 10.0).unwrap();
        assert_eq!(chosen.courier_id, CourierId::new(4));
    }

    #[test]
    fn test_no_candidates() {
        assert!(nearest_courier(&origin(), &[], 10.0).is_none());
    }
}
