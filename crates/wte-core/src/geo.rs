//! Spherical-earth helpers for the radius editor and map fitting.

use wte_api_types::Location;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Point reached from `origin` after `distance_m` along `bearing_deg`
/// (clockwise from north) on a sphere of radius [`EARTH_RADIUS_M`].
pub fn destination_point(origin: Location, distance_m: f64, bearing_deg: f64) -> Location {
    let phi1 = origin.lat.to_radians();
    let lambda1 = origin.lon.to_radians();
    let theta = bearing_deg.to_radians();
    let delta = distance_m / EARTH_RADIUS_M;

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    Location::new(phi2.to_degrees(), normalize_lon(lambda2.to_degrees()))
}

/// Great-circle distance in meters (haversine).
pub fn haversine_distance_m(a: Location, b: Location) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lon - a.lon).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Where the radius drag handle sits: due east of the center.
pub fn radius_handle_position(center: Location, radius_m: f64) -> Location {
    destination_point(center, radius_m, 90.0)
}

/// Points `radius_m` away to the north-east and south-west, the corners the
/// map flies to when framing the search circle.
pub fn radius_bounds(center: Location, radius_m: f64) -> (Location, Location) {
    (
        destination_point(center, radius_m, 45.0),
        destination_point(center, radius_m, 225.0),
    )
}

fn normalize_lon(lon: f64) -> f64 {
    if (-180.0..180.0).contains(&lon) {
        lon
    } else {
        (lon + 540.0).rem_euclid(360.0) - 180.0
    }
}
