//! Great-circle distance on a spherical Earth.

use std::f64::consts::FRAC_PI_2;

use crate::models::Coordinate;

/// Mean Earth radius used for every distance in the crate
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two coordinates in kilometers.
///
/// See http://www.movable-type.co.uk/scripts/latlong.html
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = ((d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2))
    .min(1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Shortest distance from `point` to the half meridian at `longitude` (pole to pole).
pub fn meridian_distance_km(point: Coordinate, longitude: f64) -> f64 {
    let d_lambda = angular_offset(point.longitude, longitude);
    let phi = point.latitude.to_radians();

    if d_lambda >= FRAC_PI_2 {
        // Nearest point of the half meridian is a pole
        EARTH_RADIUS_KM * (FRAC_PI_2 - phi.abs())
    } else {
        let s = (phi.cos() * d_lambda.sin()).clamp(0.0, 1.0);
        EARTH_RADIUS_KM * s.asin()
    }
}

/// Absolute longitude difference in radians, wrapped into [0, pi]
fn angular_offset(from: f64, to: f64) -> f64 {
    let diff = (to - from).rem_euclid(360.0);
    let diff = if diff > 180.0 { 360.0 - diff } else { diff };
    diff.to_radians()
}
