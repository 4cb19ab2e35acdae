//! Three-point window test for spurious position fixes.

use crate::geodesy::{distance_km, elapsed_seconds, implied_speed};
use crate::model::PositionReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowVerdict {
    Retain,
    ExcessSpeed,
}

/// Implied speed in km/s between two reports.
pub fn leg_speed(from: &PositionReport, to: &PositionReport) -> f64 {
    implied_speed(
        distance_km(from.lon_lat(), to.lon_lat()),
        elapsed_seconds(from.timestamp, to.timestamp),
    )
}

/// Two-sided test on already computed leg speeds: the middle point is
/// rejected only when both the inbound and the outbound leg exceed
/// `threshold`.
pub fn classify_speeds(speed_in: f64, speed_out: f64, threshold: f64) -> WindowVerdict {
    if speed_in > threshold && speed_out > threshold {
        WindowVerdict::ExcessSpeed
    } else {
        WindowVerdict::Retain
    }
}

/// Classify `b` in the window `(a, b, c)`. `threshold` is in km/s.
pub fn classify_middle(
    a: &PositionReport,
    b: &PositionReport,
    c: &PositionReport,
    threshold: f64,
) -> WindowVerdict {
    classify_speeds(leg_speed(a, b), leg_speed(b, c), threshold)
}
