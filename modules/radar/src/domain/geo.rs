//! Spherical geometry used by the proximity rules.

use std::f64::consts::PI;

use crate::contract::model::GeoPoint;
use crate::domain::error::DomainError;

/// Mean Earth radius (IUGG), meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Slack added to bounding boxes so float rounding never drops a point
/// that the exact distance check would accept. About 10 cm.
const BBOX_MARGIN_DEGREES: f64 = 1e-6;

/// Great-circle distance between two points (haversine).
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Build a position from raw coordinates, rejecting non-finite or out-of-range values.
pub fn validate_position(latitude: f64, longitude: f64) -> Result<GeoPoint, DomainError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(DomainError::validation(
            "latitude",
            format!("must be a finite number within [-90, 90], got {latitude}"),
        ));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(DomainError::validation(
            "longitude",
            format!("must be a finite number within [-180, 180], got {longitude}"),
        ));
    }
    Ok(GeoPoint::new(latitude, longitude))
}

/// Latitude/longitude rectangle containing every point within a radius of a center.
///
/// Used by stores as a coarse index-friendly prefilter; it may contain points
/// outside the circle but never misses one inside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    const WORLD: BoundingBox = BoundingBox {
        min_latitude: -90.0,
        max_latitude: 90.0,
        min_longitude: -180.0,
        max_longitude: 180.0,
    };

    pub fn around(center: GeoPoint, radius_meters: f64) -> Self {
        let angular = radius_meters / EARTH_RADIUS_METERS;
        if angular >= PI {
            return Self::WORLD;
        }

        let dlat = angular.to_degrees() + BBOX_MARGIN_DEGREES;
        let min_latitude = center.latitude - dlat;
        let max_latitude = center.latitude + dlat;

        // A pole inside the circle means every meridian is reachable.
        if min_latitude <= -90.0 || max_latitude >= 90.0 {
            return Self {
                min_latitude: min_latitude.max(-90.0),
                max_latitude: max_latitude.min(90.0),
                ..Self::WORLD
            };
        }

        let ratio = angular.sin() / center.latitude.to_radians().cos();
        if ratio >= 1.0 {
            return Self {
                min_latitude,
                max_latitude,
                ..Self::WORLD
            };
        }
        let dlon = ratio.asin().to_degrees() + BBOX_MARGIN_DEGREES;
        let min_longitude = center.longitude - dlon;
        let max_longitude = center.longitude + dlon;

        // Crossing the antimeridian: widen to all longitudes rather than split the box.
        if min_longitude < -180.0 || max_longitude > 180.0 {
            return Self {
                min_latitude,
                max_latitude,
                ..Self::WORLD
            };
        }

        Self {
            min_latitude,
            max_latitude,
            min_longitude,
            max_longitude,
        }
    }

    pub fn spans_all_longitudes(&self) -> bool {
        self.min_longitude <= -180.0 && self.max_longitude >= 180.0
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&p.latitude)
            && (self.min_longitude..=self.max_longitude).contains(&p.longitude)
    }
}
