//! Great-circle distance helpers.
//!
//! Spherical earth approximation, good to well under a percent at the
//! distances watch filters care about.

use std::f64::consts::PI;

use super::reading::Reading;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const DEG_TO_RAD: f64 = PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / PI;

/// Haversine distance between two (latitude, longitude) points, in meters.
pub fn distance_m(from: (f64, f64), to: (f64, f64)) -> f64 {
    let lat1 = from.0 * DEG_TO_RAD;
    let lat2 = to.0 * DEG_TO_RAD;
    let dlat = (to.0 - from.0) * DEG_TO_RAD;
    let dlon = (to.1 - from.1) * DEG_TO_RAD;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Distance between two readings, in meters.
pub fn distance_between(a: &Reading, b: &Reading) -> f64 {
    distance_m(a.position(), b.position())
}

/// Project a point along a heading for a distance in meters.
///
/// Returns the destination as (latitude, longitude), longitude normalized
/// to -180..180.
pub fn project(start: (f64, f64), heading_deg: f64, distance_m: f64) -> (f64, f64) {
    let lat1 = start.0 * DEG_TO_RAD;
    let lon1 = start.1 * DEG_TO_RAD;
    let heading = heading_deg * DEG_TO_RAD;
    let angular = distance_m / EARTH_RADIUS_M;

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * heading.cos()).asin();
    let lon2 = lon1
        + (heading.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat2.sin());

    let mut lon2 = lon2 * RAD_TO_DEG;
    if lon2 > 180.0 {
        lon2 -= 360.0;
    } else if lon2 < -180.0 {
        lon2 += 360.0;
    }

    (lat2 * RAD_TO_DEG, lon2)
}
