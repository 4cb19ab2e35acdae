//! CSV input of normalized reports and output of segment, discard and
//! summary sinks.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;

use crate::model::PositionReport;
use crate::track::{DiscardReason, VesselSegments};

/// Read header-less normalized reports.
pub fn read_reports<R: Read>(reader: R) -> Result<Vec<PositionReport>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut reports = Vec::new();
    for result in rdr.records() {
        let record = result.context("unreadable report")?;
        // Blank lines are skipped by the reader, so count from the record itself
        let line = record.position().map_or(0, |pos| pos.line());
        let report = record
            .deserialize::<PositionReport>(None)
            .with_context(|| format!("malformed report on line {}", line))?;
        reports.push(report);
    }
    Ok(reports)
}

fn writer<W: Write>(sink: W) -> csv::Writer<W> {
    csv::WriterBuilder::new().has_headers(false).from_writer(sink)
}

/// One row per retained point: `segment_index, epoch_seconds, <report fields>`.
pub fn write_segments<W: Write>(sink: W, fleet: &[VesselSegments]) -> Result<()> {
    let mut wtr = writer(sink);
    for track in fleet.iter().flat_map(|v| &v.tracks) {
        for point in &track.points {
            let mut row = vec![track.segment_index.to_string(), point.epoch_seconds().to_string()];
            row.extend(point.to_fields());
            wtr.write_record(&row)?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// One row per discard of `reason`: `reason, epoch_seconds, <report fields>`.
pub fn write_discards<W: Write>(
    sink: W,
    fleet: &[VesselSegments],
    reason: DiscardReason,
) -> Result<usize> {
    let mut wtr = writer(sink);
    let mut count = 0;
    for discard in fleet.iter().flat_map(|v| v.discards_for(reason)) {
        let mut row = vec![
            reason.as_str().to_string(),
            discard.report.epoch_seconds().to_string(),
        ];
        row.extend(discard.report.to_fields());
        wtr.write_record(&row)?;
        count += 1;
    }
    wtr.flush()?;
    Ok(count)
}

pub fn write_summaries<W: Write>(sink: W, fleet: &[VesselSegments]) -> Result<()> {
    let mut wtr = writer(sink);
    for track in fleet.iter().flat_map(|v| &v.tracks) {
        if let Some(summary) = track.summary() {
            wtr.write_record(summary.to_fields())?;
        }
    }
    wtr.flush()?;
    Ok(())
}

fn create(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("failed to create {}", path.display()))
}

/// Write all sinks for one input file into `dir`: `<name>`,
/// `<reason>_<name>` for each discard reason, and `summary_<name>`.
pub fn write_outputs(dir: &Path, name: &str, fleet: &[VesselSegments]) -> Result<()> {
    write_segments(create(&dir.join(name))?, fleet)?;

    for reason in DiscardReason::ALL {
        let path = dir.join(format!("{}_{}", reason.as_str(), name));
        let count = write_discards(create(&path)?, fleet, reason)?;
        debug!("{}: {} rows", path.display(), count);
    }

    write_summaries(create(&dir.join(format!("summary_{}", name)))?, fleet)
}
