//! Caller-supplied tunables for the two segmentation modes.
//!
//! Nothing here has a default: the historic values (180 s separation,
//! 160 kph ceiling, 1-86.39 kt point-to-point bounds, 7200 s elapsed
//! ceiling) are policy of whoever runs the engine.

use crate::error::{Result, SegmentError};
use crate::geodesy::{knots_to_km_s, kph_to_km_s};

/// Below 0.5 knots the vessel is considered stopped
pub const STOP_SPEED_KNOTS: f64 = 0.5;

/// Parameters for the stop/run segmenter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdConfig {
    /// Gap (seconds) at or above which consecutive points are split
    pub track_separation_time: i64,
    /// Ceiling on implied speed between track points, in kph
    pub max_point_speed_kph: f64,
}

impl ThresholdConfig {
    pub fn new(track_separation_time: i64, max_point_speed_kph: f64) -> Result<Self> {
        if track_separation_time <= 0 {
            return Err(SegmentError::InvalidParameter {
                name: "track_separation_time",
                value: track_separation_time as f64,
                reason: "must be a positive number of seconds",
            });
        }
        if !max_point_speed_kph.is_finite() || max_point_speed_kph <= 0.0 {
            return Err(SegmentError::InvalidParameter {
                name: "max_point_speed_kph",
                value: max_point_speed_kph,
                reason: "must be positive and finite",
            });
        }
        Ok(Self {
            track_separation_time,
            max_point_speed_kph,
        })
    }

    /// Speed ceiling in km/s.
    pub fn speed_threshold_km_s(&self) -> f64 {
        kph_to_km_s(self.max_point_speed_kph)
    }

    /// Stop floor in km/s.
    pub fn stop_speed_km_s(&self) -> f64 {
        knots_to_km_s(STOP_SPEED_KNOTS)
    }
}

/// Parameters for point-to-point (short-track) mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointToPointConfig {
    /// Exclusive lower bound on pair speed, knots
    pub min_speed_bound_kts: f64,
    /// Exclusive upper bound on pair speed, knots
    pub max_speed_bound_kts: f64,
    /// Exclusive ceiling on pair elapsed time, seconds
    pub max_elapsed_time: i64,
}

impl PointToPointConfig {
    pub fn new(
        min_speed_bound_kts: f64,
        max_speed_bound_kts: f64,
        max_elapsed_time: i64,
    ) -> Result<Self> {
        if !min_speed_bound_kts.is_finite() || min_speed_bound_kts < 0.0 {
            return Err(SegmentError::InvalidParameter {
                name: "min_speed_bound_kts",
                value: min_speed_bound_kts,
                reason: "must be zero or positive",
            });
        }
        if !max_speed_bound_kts.is_finite() || max_speed_bound_kts <= min_speed_bound_kts {
            return Err(SegmentError::InvalidParameter {
                name: "max_speed_bound_kts",
                value: max_speed_bound_kts,
                reason: "must be finite and greater than min_speed_bound_kts",
            });
        }
        if max_elapsed_time <= 0 {
            return Err(SegmentError::InvalidParameter {
                name: "max_elapsed_time",
                value: max_elapsed_time as f64,
                reason: "must be a positive number of seconds",
            });
        }
        Ok(Self {
            min_speed_bound_kts,
            max_speed_bound_kts,
            max_elapsed_time,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentationMode {
    /// Stop/run segmentation with outlier rejection
    Threshold(ThresholdConfig),
    /// Every plausible adjacent pair is its own segment
    PointToPoint(PointToPointConfig),
}
