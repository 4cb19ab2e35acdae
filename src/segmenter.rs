//! Stop/run segmentation of one vessel's time-ordered reports.
//!
//! Reports are fed one at a time through [`Segmenter::push`]. Each one is
//! validated against the last accepted report, then drives a three-state
//! machine:
//!
//! - `AwaitingFirst`: nothing buffered.
//! - `AwaitingSecond`: one point buffered, waiting for a partner close
//!   enough in time and with the same navigational status.
//! - `InRun`: two or more points. Every leg of the run except the last has
//!   passed the speed tests; the last leg is judged once the next point
//!   arrives, or when the run is closed.
//!
//! A run is closed on a time gap of at least `track_separation_time`, on a
//! navigational status change, when the vessel stops (implied speed under
//! the stop floor) and around speed discontinuities. Every report ends up in
//! exactly one track or one discard.

use std::mem;

use crate::config::ThresholdConfig;
use crate::geodesy::elapsed_seconds;
use crate::model::PositionReport;
use crate::outlier::{classify_speeds, leg_speed, WindowVerdict};
use crate::track::{DiscardReason, TrackAssembler, VesselSegments};
use crate::validate::{validate, PointStatus};

#[derive(Debug)]
enum RunState {
    AwaitingFirst,
    AwaitingSecond(PositionReport),
    InRun(Vec<PositionReport>),
}

/// Observable state of a [`Segmenter`], for callers and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    AwaitingFirst,
    AwaitingSecond,
    InRun { points: usize },
}

#[derive(Debug)]
pub struct Segmenter {
    separation_time: i64,
    speed_ceiling: f64,
    stop_floor: f64,
    last_accepted: Option<PositionReport>,
    state: RunState,
    assembler: TrackAssembler,
}

impl Segmenter {
    pub fn new(mmsi: &str, config: &ThresholdConfig) -> Self {
        Self {
            separation_time: config.track_separation_time,
            speed_ceiling: config.speed_threshold_km_s(),
            stop_floor: config.stop_speed_km_s(),
            last_accepted: None,
            state: RunState::AwaitingFirst,
            assembler: TrackAssembler::new(mmsi),
        }
    }

    pub fn state(&self) -> SegmenterState {
        match &self.state {
            RunState::AwaitingFirst => SegmenterState::AwaitingFirst,
            RunState::AwaitingSecond(_) => SegmenterState::AwaitingSecond,
            RunState::InRun(run) => SegmenterState::InRun { points: run.len() },
        }
    }

    /// Consume the next report of the stream.
    pub fn push(&mut self, report: PositionReport) {
        match validate(&report, self.last_accepted.as_ref()) {
            PointStatus::InvalidCoordinate => {
                self.assembler
                    .discard(report, DiscardReason::InvalidCoordinate);
            }
            PointStatus::Duplicate => {
                self.assembler.discard(report, DiscardReason::Duplicate);
            }
            PointStatus::Valid => {
                self.last_accepted = Some(report.clone());
                let state = mem::replace(&mut self.state, RunState::AwaitingFirst);
                self.state = self.step(state, report);
            }
        }
    }

    /// Flush whatever is buffered and hand back the vessel's output.
    pub fn finish(mut self) -> VesselSegments {
        match mem::replace(&mut self.state, RunState::AwaitingFirst) {
            RunState::AwaitingFirst => {}
            RunState::AwaitingSecond(lone) => {
                self.assembler.discard(lone, DiscardReason::Orphaned);
            }
            RunState::InRun(run) => self.close_run(run),
        }
        self.assembler.finish()
    }

    fn step(&mut self, state: RunState, next: PositionReport) -> RunState {
        match state {
            RunState::AwaitingFirst => RunState::AwaitingSecond(next),
            RunState::AwaitingSecond(first) => {
                if self.breaks(&first, &next) {
                    self.assembler.discard(first, DiscardReason::Orphaned);
                    RunState::AwaitingSecond(next)
                } else {
                    RunState::InRun(vec![first, next])
                }
            }
            RunState::InRun(run) => self.advance(run, next),
        }
    }

    /// True if `next` cannot follow `prev` in the same run.
    fn breaks(&self, prev: &PositionReport, next: &PositionReport) -> bool {
        elapsed_seconds(prev.timestamp, next.timestamp) >= self.separation_time
            || prev.navigational_status != next.navigational_status
    }

    /// A leg exactly at the stop floor still counts as moving.
    fn is_stopped(&self, speed: f64) -> bool {
        speed < self.stop_floor
    }

    // Window (a, b, c): a and b are the last two points of the run, c is new.
    fn advance(&mut self, mut run: Vec<PositionReport>, c: PositionReport) -> RunState {
        let n = run.len();
        if self.breaks(&run[n - 1], &c) {
            self.close_run(run);
            return RunState::AwaitingSecond(c);
        }

        let speed_ab = leg_speed(&run[n - 2], &run[n - 1]);
        if speed_ab < self.speed_ceiling {
            if self.is_stopped(speed_ab) {
                // Stopped between a and b: the run ends at a, b opens the next one
                let mut next_run = run.split_off(n - 1);
                self.assembler
                    .emit_or_discard(run, DiscardReason::Stationary);
                next_run.push(c);
                return RunState::InRun(next_run);
            }
            run.push(c);
            return RunState::InRun(run);
        }

        let speed_bc = leg_speed(&run[n - 1], &c);
        match classify_speeds(speed_ab, speed_bc, self.speed_ceiling) {
            WindowVerdict::ExcessSpeed => {
                for b in run.split_off(n - 1) {
                    self.assembler.discard(b, DiscardReason::ExcessSpeed);
                }
                self.extend_verified(run, c)
            }
            WindowVerdict::Retain => {
                // b and c agree, so the jump is between a and b. A lone a is a
                // stranded leading point; a longer run ends at a.
                let mut next_run = run.split_off(n - 1);
                self.assembler.emit_or_discard(run, DiscardReason::Orphaned);
                next_run.push(c);
                RunState::InRun(next_run)
            }
        }
    }

    /// Append `c` to a run whose legs have all been verified.
    fn extend_verified(&mut self, mut run: Vec<PositionReport>, c: PositionReport) -> RunState {
        let broken = run.last().map_or(true, |a| self.breaks(a, &c));
        if broken {
            self.assembler.emit_or_discard(run, DiscardReason::Orphaned);
            return RunState::AwaitingSecond(c);
        }
        run.push(c);
        RunState::InRun(run)
    }

    /// Close a run whose last leg has not been judged yet.
    fn close_run(&mut self, mut run: Vec<PositionReport>) {
        let n = run.len();
        if n < 2 {
            self.assembler.emit_or_discard(run, DiscardReason::Orphaned);
            return;
        }

        let speed = leg_speed(&run[n - 2], &run[n - 1]);
        if speed < self.speed_ceiling && !self.is_stopped(speed) {
            self.assembler.emit_or_discard(run, DiscardReason::InsufficientPoints);
            return;
        }

        let tail = run.split_off(n - 1);
        let (head_reason, tail_reason) = if self.is_stopped(speed) {
            (DiscardReason::Stationary, DiscardReason::Stationary)
        } else {
            (DiscardReason::InsufficientPoints, DiscardReason::Orphaned)
        };
        self.assembler.emit_or_discard(run, head_reason);
        for last in tail {
            self.assembler.discard(last, tail_reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::EARTH_RADIUS_KM;
    use crate::model::NavigationalStatus;
    use chrono::{TimeZone, Utc};

    fn config() -> ThresholdConfig {
        ThresholdConfig::new(180, 160.0).unwrap()
    }

    fn at(secs: i64, lat: f64, lon: f64) -> PositionReport {
        let t = Utc.timestamp_opt(secs, 0).unwrap();
        PositionReport::new(t, "316001234", lat, lon)
    }

    // Heading north at roughly 10 knots (0.0005 deg latitude per 10 s)
    fn cruising(count: usize, start_secs: i64) -> Vec<PositionReport> {
        (0..count)
            .map(|i| at(start_secs + 10 * i as i64, 49.0 + 0.0005 * i as f64, -123.0))
            .collect()
    }

    fn run_all(reports: Vec<PositionReport>) -> VesselSegments {
        let mut segmenter = Segmenter::new("316001234", &config());
        for report in reports {
            segmenter.push(report);
        }
        segmenter.finish()
    }

    #[test]
    fn test_state_transitions() {
        let mut segmenter = Segmenter::new("316001234", &config());
        assert_eq!(segmenter.state(), SegmenterState::AwaitingFirst);

        segmenter.push(at(0, 49.0, -123.0));
        assert_eq!(segmenter.state(), SegmenterState::AwaitingSecond);

        segmenter.push(at(10, 49.0005, -123.0));
        assert_eq!(segmenter.state(), SegmenterState::InRun { points: 2 });

        segmenter.push(at(20, 49.001, -123.0));
        assert_eq!(segmenter.state(), SegmenterState::InRun { points: 3 });

        // Gap: run closes, new point waits for a partner
        segmenter.push(at(1000, 49.01, -123.0));
        assert_eq!(segmenter.state(), SegmenterState::AwaitingSecond);

        let out = segmenter.finish();
        assert_eq!(out.tracks.len(), 1);
        assert_eq!(out.tracks[0].len(), 3);
        assert_eq!(out.discards.len(), 1);
        assert_eq!(out.discards[0].reason, DiscardReason::Orphaned);
    }

    #[test]
    fn test_second_point_too_late_orphans_first() {
        let out = run_all(vec![
            at(0, 49.0, -123.0),
            at(500, 49.001, -123.0),
            at(510, 49.0015, -123.0),
        ]);
        assert_eq!(out.tracks.len(), 1);
        assert_eq!(out.tracks[0].points[0].epoch_seconds(), 500);
        assert_eq!(out.discards.len(), 1);
        assert_eq!(out.discards[0].report.epoch_seconds(), 0);
        assert_eq!(out.discards[0].reason, DiscardReason::Orphaned);
    }

    #[test]
    fn test_gap_of_exactly_separation_time_splits() {
        let out = run_all(vec![
            at(0, 49.0, -123.0),
            at(180, 49.005, -123.0),
            at(240, 49.007, -123.0),
        ]);
        assert_eq!(out.tracks.len(), 1);
        assert_eq!(
            out.tracks[0]
                .points
                .iter()
                .map(PositionReport::epoch_seconds)
                .collect::<Vec<_>>(),
            vec![180, 240]
        );
        assert_eq!(out.discards.len(), 1);
        assert_eq!(out.discards[0].report.epoch_seconds(), 0);
        assert_eq!(out.discards[0].reason, DiscardReason::Orphaned);

        // One second short of the separation time keeps the run whole
        let out = run_all(vec![
            at(0, 49.0, -123.0),
            at(179, 49.005, -123.0),
            at(239, 49.007, -123.0),
        ]);
        assert_eq!(out.tracks.len(), 1);
        assert_eq!(out.tracks[0].len(), 3);
        assert!(out.discards.is_empty());
    }

    #[test]
    fn test_status_change_before_second_point_orphans_first() {
        let fishing = |r: PositionReport| r.with_status(NavigationalStatus::EngagedInFishing);
        let out = run_all(vec![
            at(0, 49.0, -123.0),
            fishing(at(10, 49.0005, -123.0)),
            fishing(at(20, 49.001, -123.0)),
        ]);
        assert_eq!(out.tracks.len(), 1);
        assert_eq!(out.tracks[0].points[0].epoch_seconds(), 10);
        assert_eq!(out.tracks[0].len(), 2);
        assert_eq!(out.discards.len(), 1);
        assert_eq!(out.discards[0].report.epoch_seconds(), 0);
        assert_eq!(out.discards[0].reason, DiscardReason::Orphaned);
    }

    #[test]
    fn test_stop_floor_counts_as_moving() {
        let segmenter = Segmenter::new("316001234", &config());
        let floor = config().stop_speed_km_s();
        assert!(!segmenter.is_stopped(floor));
        assert!(segmenter.is_stopped(floor * (1.0 - 1e-9)));
        assert!(!segmenter.is_stopped(floor * (1.0 + 1e-9)));
    }

    // Leading leg of `speed_km_s` over 60 s, then cruising north
    fn departure(speed_km_s: f64) -> Vec<PositionReport> {
        let deg = (speed_km_s * 60.0 / EARTH_RADIUS_KM).to_degrees();
        let mut reports = vec![at(0, 49.0, -123.0)];
        reports.extend(cruising(3, 60).into_iter().map(|r| PositionReport {
            latitude: r.latitude + deg,
            ..r
        }));
        reports
    }

    #[test]
    fn test_leg_just_above_stop_floor_stays_in_run() {
        let out = run_all(departure(config().stop_speed_km_s() * 1.001));
        assert_eq!(out.tracks.len(), 1);
        assert_eq!(out.tracks[0].len(), 4);
        assert!(out.discards.is_empty());
    }

    #[test]
    fn test_leg_just_below_stop_floor_ends_run() {
        let out = run_all(departure(config().stop_speed_km_s() * 0.999));
        assert_eq!(out.tracks.len(), 1);
        assert_eq!(out.tracks[0].len(), 3);
        assert_eq!(out.tracks[0].points[0].epoch_seconds(), 60);
        assert_eq!(out.discards.len(), 1);
        assert_eq!(out.discards[0].report.epoch_seconds(), 0);
        assert_eq!(out.discards[0].reason, DiscardReason::Stationary);
    }

    #[test]
    fn test_invalid_and_duplicate_are_classified() {
        let mut reports = cruising(4, 0);
        reports.insert(2, reports[1].clone());
        reports.insert(4, at(25, 91.0, -123.0));
        let out = run_all(reports);

        assert_eq!(out.tracks.len(), 1);
        assert_eq!(out.tracks[0].len(), 4);
        assert_eq!(out.discards_for(DiscardReason::Duplicate).count(), 1);
        assert_eq!(out.discards_for(DiscardReason::InvalidCoordinate).count(), 1);
    }

    #[test]
    fn test_status_change_splits_run() {
        let mut reports = cruising(6, 0);
        for report in reports.iter_mut().skip(3) {
            report.navigational_status = NavigationalStatus::EngagedInFishing;
        }
        let out = run_all(reports);
        assert_eq!(out.tracks.len(), 2);
        assert_eq!(out.tracks[0].len(), 3);
        assert_eq!(out.tracks[1].len(), 3);
        assert_eq!(out.tracks[1].segment_index, 1);
        assert!(out.discards.is_empty());
    }

    #[test]
    fn test_leading_outlier_is_orphaned() {
        let mut reports = vec![at(0, 49.5, -123.0)];
        reports.extend(cruising(4, 10));
        let out = run_all(reports);

        assert_eq!(out.tracks.len(), 1);
        assert_eq!(out.tracks[0].len(), 4);
        assert_eq!(out.discards.len(), 1);
        assert_eq!(out.discards[0].report.epoch_seconds(), 0);
        assert_eq!(out.discards[0].reason, DiscardReason::Orphaned);
    }

    #[test]
    fn test_trailing_outlier_is_orphaned() {
        let mut reports = cruising(4, 0);
        reports.push(at(40, 49.5, -123.0));
        let out = run_all(reports);

        assert_eq!(out.tracks.len(), 1);
        assert_eq!(out.tracks[0].len(), 4);
        assert_eq!(out.discards.len(), 1);
        assert_eq!(out.discards[0].report.epoch_seconds(), 40);
        assert_eq!(out.discards[0].reason, DiscardReason::Orphaned);
    }

    #[test]
    fn test_mid_run_spike_is_excess_speed() {
        let mut reports = cruising(6, 0);
        reports[3].longitude = -122.9;
        let out = run_all(reports);

        assert_eq!(out.tracks.len(), 1);
        assert_eq!(out.tracks[0].len(), 5);
        let excess: Vec<_> = out.discards_for(DiscardReason::ExcessSpeed).collect();
        assert_eq!(excess.len(), 1);
        assert_eq!(excess[0].report.epoch_seconds(), 30);
    }

    #[test]
    fn test_jump_between_consistent_runs_splits() {
        // Two plausible runs with an implausible jump between them
        let mut reports = cruising(4, 0);
        reports.extend(
            cruising(4, 40)
                .into_iter()
                .map(|r| PositionReport { longitude: -122.0, ..r }),
        );
        let out = run_all(reports);

        assert_eq!(out.tracks.len(), 2);
        assert_eq!(out.tracks[0].len(), 4);
        assert_eq!(out.tracks[1].len(), 4);
        assert!(out.discards.is_empty());
    }

    #[test]
    fn test_stationary_vessel_never_forms_track() {
        let reports = (0..5).map(|i| at(i * 30, 49.0, -123.0)).collect();
        let out = run_all(reports);
        assert!(out.tracks.is_empty());
        assert_eq!(out.discards.len(), 5);
        assert!(out
            .discards
            .iter()
            .all(|d| d.reason == DiscardReason::Stationary));
    }

    #[test]
    fn test_zero_elapsed_pair_is_split() {
        let out = run_all(vec![at(0, 49.0, -123.0), at(0, 49.001, -123.0)]);
        assert!(out.tracks.is_empty());
        assert_eq!(out.discards_for(DiscardReason::InsufficientPoints).count(), 1);
        assert_eq!(out.discards_for(DiscardReason::Orphaned).count(), 1);
    }

    #[test]
    fn test_empty_and_single() {
        assert_eq!(
            run_all(Vec::new()),
            VesselSegments {
                mmsi: "316001234".to_string(),
                ..VesselSegments::default()
            }
        );

        let out = run_all(vec![at(0, 49.0, -123.0)]);
        assert!(out.tracks.is_empty());
        assert_eq!(out.discards.len(), 1);
        assert_eq!(out.discards[0].reason, DiscardReason::Orphaned);
    }
}
