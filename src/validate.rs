use crate::model::PositionReport;

/// Per-point verdict of the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointStatus {
    Valid,
    InvalidCoordinate,
    Duplicate,
}

/// Classify `report` against the last report the caller accepted.
///
/// A duplicate must match the predecessor exactly on latitude, longitude
/// and timestamp.
pub fn validate(
    report: &PositionReport,
    previous_accepted: Option<&PositionReport>,
) -> PointStatus {
    if !report.is_coordinate_valid() {
        return PointStatus::InvalidCoordinate;
    }

    match previous_accepted {
        Some(prev)
            if prev.latitude == report.latitude
                && prev.longitude == report.longitude
                && prev.timestamp == report.timestamp =>
        {
            PointStatus::Duplicate
        }
        _ => PointStatus::Valid,
    }
}
