//! Error type for engine configuration and contract violations.
//!
//! Data-quality problems in the input are not errors: they end up as
//! [`crate::track::DiscardReason`]s. This type only covers callers handing
//! the engine something it cannot work with.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum SegmentError {
    /// A tunable parameter was out of range
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
    /// Reports from more than one vessel were passed to a per-vessel call
    MixedVessels { expected: String, found: String },
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentError::InvalidParameter {
                name,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{}' = {}: {}", name, value, reason)
            }
            SegmentError::MixedVessels { expected, found } => {
                write!(
                    f,
                    "Expected reports for MMSI '{}' only, found MMSI '{}'",
                    expected, found
                )
            }
        }
    }
}

impl std::error::Error for SegmentError {}

pub type Result<T> = std::result::Result<T, SegmentError>;
