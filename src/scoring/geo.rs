//! Great-circle distance

use crate::results::Coordinates;

/// Mean Earth radius in miles
pub const EARTH_RADIUS_MI: f64 = 3959.0;

/// Haversine distance between two points, in miles
pub fn haversine_miles(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_MI * h.sqrt().atan2((1.0 - h).sqrt())
}
