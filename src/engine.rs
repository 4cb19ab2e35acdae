//! Entry points: one vessel, or a whole fleet in parallel.

use std::collections::BTreeMap;

use log::debug;
use rayon::prelude::*;

use crate::config::{SegmentationMode, ThresholdConfig};
use crate::error::{Result, SegmentError};
use crate::model::PositionReport;
use crate::point_to_point::segment_pairs;
use crate::segmenter::Segmenter;
use crate::track::{SegmentStats, VesselSegments};

/// Segment one vessel's reports, which must be in timestamp order.
///
/// Returns an empty result for an empty stream, and an error if the reports
/// belong to more than one MMSI.
pub fn segment_vessel(
    reports: Vec<PositionReport>,
    mode: &SegmentationMode,
) -> Result<VesselSegments> {
    let mmsi = match reports.first() {
        Some(first) => first.mmsi.clone(),
        None => return Ok(VesselSegments::default()),
    };
    if let Some(stray) = reports.iter().find(|r| r.mmsi != mmsi) {
        return Err(SegmentError::MixedVessels {
            expected: mmsi,
            found: stray.mmsi.clone(),
        });
    }

    let input_count = reports.len();
    let segments = match mode {
        SegmentationMode::Threshold(config) => segment_threshold(&mmsi, reports, config),
        SegmentationMode::PointToPoint(config) => segment_pairs(&mmsi, reports, config),
    };

    debug!(
        "mmsi {}: {} reports -> {} tracks, {} discards",
        mmsi,
        input_count,
        segments.tracks.len(),
        segments.discards.len()
    );
    Ok(segments)
}

fn segment_threshold(
    mmsi: &str,
    reports: Vec<PositionReport>,
    config: &ThresholdConfig,
) -> VesselSegments {
    let mut segmenter = Segmenter::new(mmsi, config);
    for report in reports {
        segmenter.push(report);
    }
    segmenter.finish()
}

/// Split a mixed stream by MMSI, keeping each vessel's input order.
pub fn group_by_vessel(reports: Vec<PositionReport>) -> BTreeMap<String, Vec<PositionReport>> {
    let mut vessels: BTreeMap<String, Vec<PositionReport>> = BTreeMap::new();
    for report in reports {
        vessels.entry(report.mmsi.clone()).or_default().push(report);
    }
    vessels
}

/// Segment every vessel in `reports` in parallel, ordered by MMSI.
pub fn segment_fleet(
    reports: Vec<PositionReport>,
    mode: &SegmentationMode,
) -> Result<Vec<VesselSegments>> {
    group_by_vessel(reports)
        .into_par_iter()
        .map(|(_, vessel_reports)| segment_vessel(vessel_reports, mode))
        .collect()
}

pub fn fleet_stats(fleet: &[VesselSegments]) -> SegmentStats {
    let mut total = SegmentStats::default();
    for vessel in fleet {
        total.merge(&vessel.stats());
    }
    total
}
