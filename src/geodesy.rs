//! Great-circle geometry and speed helpers.
//!
//! Coordinates are `(longitude, latitude)` pairs in decimal degrees.
//! Speeds are kilometres per second unless the name says otherwise.

use chrono::{DateTime, Utc};

/// Mean Earth radius used for all distances
pub const EARTH_RADIUS_KM: f64 = 6367.0;

pub const KM_PER_NAUTICAL_MILE: f64 = 1.852;

/// Implied speed for a positive distance covered in no time.
/// Exceeds any plausible vessel speed.
pub const UNBOUNDED_SPEED_KM_S: f64 = 999.0;

/// Haversine distance in kilometres.
pub fn distance_km(p1: (f64, f64), p2: (f64, f64)) -> f64 {
    let (lon1, lat1) = (p1.0.to_radians(), p1.1.to_radians());
    let (lon2, lat2) = (p2.0.to_radians(), p2.1.to_radians());

    let dlon = lon2 - lon1;
    let dlat = lat2 - lat1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Clamp guards asin against rounding just above 1 for antipodal points
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Initial great-circle bearing from `p1` to `p2`, in `[0, 360)`.
pub fn bearing_deg(p1: (f64, f64), p2: (f64, f64)) -> f64 {
    let (lambda1, phi1) = (p1.0.to_radians(), p1.1.to_radians());
    let (lambda2, phi2) = (p2.0.to_radians(), p2.1.to_radians());

    let y = (lambda2 - lambda1).sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * (lambda2 - lambda1).cos();

    let bearing = y.atan2(x).to_degrees().rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// Signed `t2 - t1` in seconds.
pub fn elapsed_seconds(t1: DateTime<Utc>, t2: DateTime<Utc>) -> i64 {
    t2.signed_duration_since(t1).num_seconds()
}

/// Speed in km/s implied by covering `distance` in `elapsed` seconds.
///
/// No distance means no speed, whatever the elapsed time. A positive
/// distance with no (or negative) elapsed time yields
/// [`UNBOUNDED_SPEED_KM_S`].
pub fn implied_speed(distance: f64, elapsed: i64) -> f64 {
    if distance == 0.0 {
        0.0
    } else if elapsed > 0 {
        distance / elapsed as f64
    } else {
        UNBOUNDED_SPEED_KM_S
    }
}

pub fn kph_to_km_s(kph: f64) -> f64 {
    kph / 3600.0
}

pub fn knots_to_km_s(knots: f64) -> f64 {
    knots * KM_PER_NAUTICAL_MILE / 3600.0
}

pub fn km_s_to_knots(km_s: f64) -> f64 {
    km_s * 3600.0 / KM_PER_NAUTICAL_MILE
}
