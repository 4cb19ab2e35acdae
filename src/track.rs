//! Output model: tracks, discards, and the assembler that builds them.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::geodesy::{bearing_deg, distance_km, elapsed_seconds, implied_speed, km_s_to_knots};
use crate::model::PositionReport;

/// Why a report was left out of every track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiscardReason {
    InvalidCoordinate,
    Duplicate,
    ExcessSpeed,
    Stationary,
    Orphaned,
    InsufficientPoints,
}

impl DiscardReason {
    pub const ALL: [DiscardReason; 6] = [
        DiscardReason::InvalidCoordinate,
        DiscardReason::Duplicate,
        DiscardReason::ExcessSpeed,
        DiscardReason::Stationary,
        DiscardReason::Orphaned,
        DiscardReason::InsufficientPoints,
    ];

    /// Short name, also used as the discard file prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscardReason::InvalidCoordinate => "invalid",
            DiscardReason::Duplicate => "duplicate",
            DiscardReason::ExcessSpeed => "excess_speed",
            DiscardReason::Stationary => "stationary",
            DiscardReason::Orphaned => "orphaned",
            DiscardReason::InsufficientPoints => "insufficient",
        }
    }
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscardRecord {
    pub report: PositionReport,
    pub reason: DiscardReason,
}

/// Consecutive accepted reports of one vessel.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub mmsi: String,
    /// Sequential per vessel, from 0
    pub segment_index: u32,
    pub points: Vec<PositionReport>,
}

impl Track {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sum of the haversine legs, in kilometres.
    pub fn length_km(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| distance_km(w[0].lon_lat(), w[1].lon_lat()))
            .sum()
    }

    pub fn elapsed_seconds(&self) -> i64 {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => elapsed_seconds(first.timestamp, last.timestamp),
            _ => 0,
        }
    }

    pub fn summary(&self) -> Option<TrackSummary> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        let length_km = self.length_km();
        let elapsed = self.elapsed_seconds();
        let initial_bearing_deg = self
            .points
            .get(1)
            .map(|second| bearing_deg(first.lon_lat(), second.lon_lat()));

        Some(TrackSummary {
            mmsi: self.mmsi.clone(),
            segment_index: self.segment_index,
            point_count: self.points.len(),
            start: first.timestamp,
            end: last.timestamp,
            elapsed_seconds: elapsed,
            length_km,
            mean_speed_kts: if elapsed > 0 {
                km_s_to_knots(implied_speed(length_km, elapsed))
            } else {
                0.0
            },
            initial_bearing_deg,
        })
    }
}

/// Per-track attributes for line export.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSummary {
    pub mmsi: String,
    pub segment_index: u32,
    pub point_count: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub elapsed_seconds: i64,
    pub length_km: f64,
    pub mean_speed_kts: f64,
    pub initial_bearing_deg: Option<f64>,
}

impl TrackSummary {
    pub fn to_fields(&self) -> Vec<String> {
        vec![
            self.mmsi.clone(),
            self.segment_index.to_string(),
            self.point_count.to_string(),
            self.start.format("%Y%m%d_%H%M%S").to_string(),
            self.end.format("%Y%m%d_%H%M%S").to_string(),
            self.elapsed_seconds.to_string(),
            format!("{:.6}", self.length_km),
            format!("{:.1}", self.mean_speed_kts),
            self.initial_bearing_deg
                .map(|b| format!("{:.1}", b))
                .unwrap_or_default(),
        ]
    }
}

/// Everything the engine produced for one vessel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VesselSegments {
    pub mmsi: String,
    pub tracks: Vec<Track>,
    pub discards: Vec<DiscardRecord>,
}

impl VesselSegments {
    pub fn discards_for(&self, reason: DiscardReason) -> impl Iterator<Item = &DiscardRecord> {
        self.discards.iter().filter(move |d| d.reason == reason)
    }

    pub fn stats(&self) -> SegmentStats {
        let mut stats = SegmentStats {
            vessels: 1,
            tracks: self.tracks.len(),
            track_points: self.tracks.iter().map(Track::len).sum(),
            ..SegmentStats::default()
        };
        for discard in &self.discards {
            *stats.discards.entry(discard.reason).or_insert(0) += 1;
        }
        stats
    }
}

/// Bundles accepted runs into numbered tracks and collects discards.
#[derive(Debug)]
pub struct TrackAssembler {
    mmsi: String,
    next_index: u32,
    tracks: Vec<Track>,
    discards: Vec<DiscardRecord>,
}

impl TrackAssembler {
    pub fn new(mmsi: &str) -> Self {
        Self {
            mmsi: mmsi.to_string(),
            next_index: 0,
            tracks: Vec::new(),
            discards: Vec::new(),
        }
    }

    pub fn discard(&mut self, report: PositionReport, reason: DiscardReason) {
        self.discards.push(DiscardRecord { report, reason });
    }

    /// Emit `points` as the next track, or discard them all with `reason`
    /// if there are too few to draw a segment.
    pub fn emit_or_discard(&mut self, points: Vec<PositionReport>, reason: DiscardReason) {
        if points.len() >= 2 {
            self.tracks.push(Track {
                mmsi: self.mmsi.clone(),
                segment_index: self.next_index,
                points,
            });
            self.next_index += 1;
        } else {
            for report in points {
                self.discard(report, reason);
            }
        }
    }

    pub fn finish(self) -> VesselSegments {
        VesselSegments {
            mmsi: self.mmsi,
            tracks: self.tracks,
            discards: self.discards,
        }
    }
}

/// Counts of what a run produced, mergeable across vessels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentStats {
    pub vessels: usize,
    pub tracks: usize,
    pub track_points: usize,
    pub discards: BTreeMap<DiscardReason, usize>,
}

impl SegmentStats {
    pub fn merge(&mut self, other: &SegmentStats) {
        self.vessels += other.vessels;
        self.tracks += other.tracks;
        self.track_points += other.track_points;
        for (reason, count) in &other.discards {
            *self.discards.entry(*reason).or_insert(0) += count;
        }
    }

    pub fn discarded(&self, reason: DiscardReason) -> usize {
        self.discards.get(&reason).copied().unwrap_or(0)
    }

    pub fn total_discards(&self) -> usize {
        self.discards.values().sum()
    }
}

impl fmt::Display for SegmentStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vessels, {} segments generated from {} points",
            self.vessels, self.tracks, self.track_points
        )?;
        for reason in DiscardReason::ALL {
            write!(f, ", {} {}", self.discarded(reason), reason)?;
        }
        Ok(())
    }
}
