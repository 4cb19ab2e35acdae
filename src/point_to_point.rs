//! Point-to-point (short-track) segmentation.
//!
//! Every pair of temporally adjacent valid reports becomes its own 2-point
//! track when its implied speed lies strictly between the configured bounds
//! and its elapsed time is positive and below the ceiling. Meant for sparse
//! satellite data, where longer runs are rare.

use crate::config::PointToPointConfig;
use crate::geodesy::{distance_km, elapsed_seconds, implied_speed, km_s_to_knots};
use crate::model::PositionReport;
use crate::track::{DiscardReason, TrackAssembler, VesselSegments};
use crate::validate::{validate, PointStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairVerdict {
    Accepted,
    TooSlow,
    TooFast,
    /// Elapsed time not positive, or at or above the ceiling
    OutOfTime,
}

impl PairVerdict {
    fn discard_reason(self) -> DiscardReason {
        match self {
            PairVerdict::Accepted => DiscardReason::InsufficientPoints,
            PairVerdict::TooSlow => DiscardReason::Stationary,
            PairVerdict::TooFast => DiscardReason::ExcessSpeed,
            PairVerdict::OutOfTime => DiscardReason::Orphaned,
        }
    }
}

pub fn classify_pair(
    a: &PositionReport,
    b: &PositionReport,
    config: &PointToPointConfig,
) -> PairVerdict {
    let elapsed = elapsed_seconds(a.timestamp, b.timestamp);
    if elapsed <= 0 || elapsed >= config.max_elapsed_time {
        return PairVerdict::OutOfTime;
    }

    let speed_kts = km_s_to_knots(implied_speed(
        distance_km(a.lon_lat(), b.lon_lat()),
        elapsed,
    ));
    classify_speed(speed_kts, config)
}

/// Both speed bounds are exclusive.
fn classify_speed(speed_kts: f64, config: &PointToPointConfig) -> PairVerdict {
    if speed_kts <= config.min_speed_bound_kts {
        PairVerdict::TooSlow
    } else if speed_kts >= config.max_speed_bound_kts {
        PairVerdict::TooFast
    } else {
        PairVerdict::Accepted
    }
}

/// Segment one vessel's reports into 2-point tracks.
///
/// A retained report may belong to two consecutive tracks. A report in no
/// accepted pair is discarded with the verdict of the pair leading into it
/// (the following pair for the first report).
pub fn segment_pairs(
    mmsi: &str,
    reports: Vec<PositionReport>,
    config: &PointToPointConfig,
) -> VesselSegments {
    let mut assembler = TrackAssembler::new(mmsi);
    let mut valid: Vec<PositionReport> = Vec::with_capacity(reports.len());

    for report in reports {
        match validate(&report, valid.last()) {
            PointStatus::Valid => valid.push(report),
            PointStatus::InvalidCoordinate => {
                assembler.discard(report, DiscardReason::InvalidCoordinate)
            }
            PointStatus::Duplicate => assembler.discard(report, DiscardReason::Duplicate),
        }
    }

    let verdicts: Vec<PairVerdict> = valid
        .windows(2)
        .map(|w| classify_pair(&w[0], &w[1], config))
        .collect();

    for (pair, verdict) in valid.windows(2).zip(&verdicts) {
        if *verdict == PairVerdict::Accepted {
            assembler.emit_or_discard(pair.to_vec(), DiscardReason::InsufficientPoints);
        }
    }

    let last = valid.len().saturating_sub(1);
    for (i, report) in valid.into_iter().enumerate() {
        let inbound = if i > 0 { verdicts.get(i - 1).copied() } else { None };
        let outbound = if i < last { verdicts.get(i).copied() } else { None };
        if inbound == Some(PairVerdict::Accepted) || outbound == Some(PairVerdict::Accepted) {
            continue;
        }
        let reason = inbound
            .or(outbound)
            .map_or(DiscardReason::InsufficientPoints, PairVerdict::discard_reason);
        assembler.discard(report, reason);
    }

    assembler.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn config() -> PointToPointConfig {
        PointToPointConfig::new(1.0, 86.39, 7200).unwrap()
    }

    fn at(secs: i64, lat: f64, lon: f64) -> PositionReport {
        let t = Utc.timestamp_opt(secs, 0).unwrap();
        PositionReport::new(t, "316001234", lat, lon)
    }

    #[test]
    fn test_classify_pair() {
        // 0.01 deg latitude (~1.11 km) in 120 s is about 18 knots
        let a = at(0, 49.0, -123.0);
        let verdict = |b: PositionReport| classify_pair(&a, &b, &config());
        assert_eq!(verdict(at(120, 49.01, -123.0)), PairVerdict::Accepted);
        assert_eq!(verdict(at(120, 49.0, -123.0)), PairVerdict::TooSlow);
        assert_eq!(verdict(at(120, 49.5, -123.0)), PairVerdict::TooFast);
        assert_eq!(verdict(at(7200, 49.01, -123.0)), PairVerdict::OutOfTime);
        assert_eq!(verdict(at(0, 49.01, -123.0)), PairVerdict::OutOfTime);
    }

    #[test]
    fn test_speed_bounds_are_exclusive() {
        let config = config();
        assert_eq!(classify_speed(1.0, &config), PairVerdict::TooSlow);
        assert_eq!(classify_speed(86.39, &config), PairVerdict::TooFast);
        assert_eq!(classify_speed(1.0001, &config), PairVerdict::Accepted);
        assert_eq!(classify_speed(86.3899, &config), PairVerdict::Accepted);
    }

    #[test]
    fn test_elapsed_ceiling_is_exclusive() {
        let a = at(0, 49.0, -123.0);
        // 0.5 deg latitude in two hours is about 15 knots
        let b = |secs| at(secs, 49.5, -123.0);
        assert_eq!(classify_pair(&a, &b(7200), &config()), PairVerdict::OutOfTime);
        assert_eq!(classify_pair(&a, &b(7199), &config()), PairVerdict::Accepted);
    }

    #[test]
    fn test_every_good_pair_is_a_track() {
        let reports = (0..4).map(|i| at(i * 120, 49.0 + 0.01 * i as f64, -123.0)).collect();
        let out = segment_pairs("316001234", reports, &config());

        assert_eq!(out.tracks.len(), 3);
        assert!(out.tracks.iter().all(|t| t.len() == 2));
        assert_eq!(
            out.tracks.iter().map(|t| t.segment_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        // Shared endpoints
        assert_eq!(out.tracks[0].points[1], out.tracks[1].points[0]);
        assert!(out.discards.is_empty());
    }

    #[test]
    fn test_isolated_points_take_pair_reason() {
        let reports = vec![
            at(0, 49.0, -123.0),
            at(120, 49.01, -123.0),
            // Three hours later, then stationary
            at(10_920, 49.02, -123.0),
            at(11_040, 49.02, -123.0),
        ];
        let out = segment_pairs("316001234", reports, &config());

        assert_eq!(out.tracks.len(), 1);
        assert_eq!(out.discards.len(), 2);
        assert_eq!(out.discards[0].reason, DiscardReason::Orphaned);
        assert_eq!(out.discards[1].reason, DiscardReason::Stationary);
    }

    #[test]
    fn test_lone_and_invalid_points() {
        let out = segment_pairs(
            "316001234",
            vec![at(0, 90.0, -123.0), at(60, 49.0, -123.0)],
            &config(),
        );
        assert!(out.tracks.is_empty());
        assert_eq!(out.discards[0].reason, DiscardReason::InvalidCoordinate);
        assert_eq!(out.discards[1].reason, DiscardReason::InsufficientPoints);
    }
}
