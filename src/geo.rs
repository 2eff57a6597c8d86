//! Spherical-cap radius search helpers.
//!
//! A linear distance is turned into an angular radius by dividing by the
//! Earth's radius in the same unit; a point lies inside the cap when its
//! haversine central angle to the centre does not exceed that radius.

use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_MILES: f64 = 3963.0;
pub const EARTH_RADIUS_KM: f64 = 6378.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    #[default]
    Miles,
    Kilometers,
}

impl DistanceUnit {
    /// `mi` (default) or `km`
    pub fn from_param(param: Option<&str>) -> Option<Self> {
        match param {
            None | Some("mi") | Some("miles") => Some(DistanceUnit::Miles),
            Some("km") | Some("kilometers") => Some(DistanceUnit::Kilometers),
            Some(_) => None,
        }
    }

    pub fn earth_radius(&self) -> f64 {
        match self {
            DistanceUnit::Miles => EARTH_RADIUS_MILES,
            DistanceUnit::Kilometers => EARTH_RADIUS_KM,
        }
    }
}

/// Angular radius in radians for a linear distance
pub fn angular_radius(distance: f64, unit: DistanceUnit) -> f64 {
    distance / unit.earth_radius()
}

/// Great-circle central angle in radians (haversine)
pub fn central_angle(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlng = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

pub fn within_cap(center: Coordinates, point: Coordinates, angular_radius: f64) -> bool {
    central_angle(center, point) <= angular_radius
}

/// SQL predicate equivalent to `within_cap` over `latitude`/`longitude`
/// columns. Binds: latitude, longitude, angular radius (starting at `first`).
pub fn within_cap_sql(first: usize) -> String {
    let (lat, lng, radius) = (first, first + 1, first + 2);
    format!(
        "2 * ASIN(LEAST(1, SQRT(POWER(SIN(RADIANS(\"latitude\" - ${lat}) / 2), 2) \
         + COS(RADIANS(${lat})) * COS(RADIANS(\"latitude\")) \
         * POWER(SIN(RADIANS(\"longitude\" - ${lng}) / 2), 2)))) <= ${radius}"
    )
}
