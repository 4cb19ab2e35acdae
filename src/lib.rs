pub mod config;
pub mod engine;
pub mod error;
pub mod geodesy;
pub mod io;
pub mod model;
pub mod outlier;
pub mod point_to_point;
pub mod segmenter;
pub mod track;
pub mod validate;

pub use config::{PointToPointConfig, SegmentationMode, ThresholdConfig};
pub use engine::{fleet_stats, segment_fleet, segment_vessel};
pub use error::SegmentError;
pub use model::{NavigationalStatus, PositionReport};
pub use track::{DiscardReason, DiscardRecord, SegmentStats, Track, VesselSegments};

use anyhow::{anyhow, bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::{error, info};
use rayon::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct Config {
    pub paths: Vec<String>,
    pub output_dir: PathBuf,
    pub mode: SegmentationMode,
}

fn with_common_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("paths")
                .short('f')
                .long("file-path")
                .action(ArgAction::Append)
                .required(true)
                .help("normalized report file (one vessel or many, sorted by mmsi and time)"),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("directory for segment, discard and summary files"),
        )
}

pub fn command() -> Command {
    Command::new("ais_tracks")
        .version("0.1")
        .about("split AIS position reports into vessel track segments")
        .subcommand_required(true)
        .subcommand(with_common_args(
            Command::new("threshold")
                .about("stop/run segmentation with outlier rejection")
                .arg(
                    Arg::new("separation-time")
                        .long("separation-time")
                        .required(true)
                        .value_parser(value_parser!(i64))
                        .help("max seconds between points of a segment (historically 180)"),
                )
                .arg(
                    Arg::new("max-speed-kph")
                        .long("max-speed-kph")
                        .required(true)
                        .value_parser(value_parser!(f64))
                        .help("max implied speed between points in kph (historically 160)"),
                ),
        ))
        .subcommand(with_common_args(
            Command::new("point-to-point")
                .about("one segment per plausible pair of adjacent points")
                .arg(
                    Arg::new("min-speed-kts")
                        .long("min-speed-kts")
                        .required(true)
                        .value_parser(value_parser!(f64))
                        .help("exclusive lower speed bound in knots (historically 1)"),
                )
                .arg(
                    Arg::new("max-speed-kts")
                        .long("max-speed-kts")
                        .required(true)
                        .value_parser(value_parser!(f64))
                        .help("exclusive upper speed bound in knots (historically 86.39)"),
                )
                .arg(
                    Arg::new("max-elapsed-time")
                        .long("max-elapsed-time")
                        .required(true)
                        .value_parser(value_parser!(i64))
                        .help("exclusive ceiling on pair elapsed seconds (historically 7200)"),
                ),
        ))
}

fn required<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> Result<T> {
    matches
        .get_one::<T>(id)
        .cloned()
        .ok_or_else(|| anyhow!("missing argument --{}", id))
}

pub fn config_from_matches(matches: &ArgMatches) -> Result<Config> {
    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("no segmentation mode given"))?;

    let mode = match name {
        "threshold" => SegmentationMode::Threshold(ThresholdConfig::new(
            required(sub, "separation-time")?,
            required(sub, "max-speed-kph")?,
        )?),
        "point-to-point" => SegmentationMode::PointToPoint(PointToPointConfig::new(
            required(sub, "min-speed-kts")?,
            required(sub, "max-speed-kts")?,
            required(sub, "max-elapsed-time")?,
        )?),
        other => bail!("unknown segmentation mode '{}'", other),
    };

    let paths = sub
        .get_many::<String>("paths")
        .unwrap_or_default()
        .cloned()
        .collect::<Vec<String>>();

    Ok(Config {
        paths,
        output_dir: required(sub, "output-dir")?,
        mode,
    })
}

pub fn get_arg() -> Result<Config> {
    config_from_matches(&command().get_matches())
}

pub fn run(config: Config) -> Result<()> {
    info!("config is {:?}", config);

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("failed to create {}", config.output_dir.display()))?;

    let results: Vec<(&String, Result<SegmentStats>)> = config
        .paths
        .par_iter()
        .map(|path| (path, process_file(path, &config.output_dir, &config.mode)))
        .collect();

    let mut total = SegmentStats::default();
    let mut failed = 0;
    for (path, result) in results {
        match result {
            Ok(stats) => total.merge(&stats),
            Err(e) => {
                error!("{}: {:#}. skipping", path, e);
                failed += 1;
            }
        }
    }

    info!("completed, {}", total);
    if failed > 0 {
        bail!("{} of {} input files failed", failed, config.paths.len());
    }
    Ok(())
}

pub fn process_file(
    path: &str,
    output_dir: &Path,
    mode: &SegmentationMode,
) -> Result<SegmentStats> {
    let file = File::open(path).with_context(|| format!("failed to open file {}", path))?;
    let reports = io::read_reports(file)?;
    let report_count = reports.len();

    let fleet = segment_fleet(reports, mode)?;

    let name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("no file name in {}", path))?;
    io::write_outputs(output_dir, name, &fleet)?;

    let stats = fleet_stats(&fleet);
    info!("{} has {} reports: {}", path, report_count, stats);
    Ok(stats)
}
