use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

use celltrack_rs::calibration::Calibration;
use celltrack_rs::config::PipelineConfig;
use celltrack_rs::measurements::MeasurementTable;
use celltrack_rs::pipeline::{run, RunContext};
use celltrack_rs::roi::{measure_rois, RoiStore};
use celltrack_rs::track::LapTracker;

#[derive(Parser)]
#[command(name = "celltrack", version, about = "Track segmented cells through a timelapse")]
pub struct Args {
    /// More output: -v for debug, -vv for trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Rename, measure and track ROIs, then export the track groups
    Track(TrackArgs),
    /// Measure ROIs into a CSV table
    Measure(MeasureArgs),
}

#[derive(clap::Args)]
pub struct TrackArgs {
    /// ROI JSON file
    #[arg(long)]
    pub rois: PathBuf,
    /// Calibration JSON file
    #[arg(long)]
    pub calibration: PathBuf,
    /// Image title, names the output folder
    #[arg(long)]
    pub image: String,
    /// Output directory
    #[arg(long)]
    pub out: PathBuf,
    /// Measurement CSV to use instead of measuring the ROIs
    #[arg(long)]
    pub measurements: Option<PathBuf>,
    /// Frames are stored as hyperstack frames rather than slices
    #[arg(long)]
    pub hyperstack: bool,
    /// JSON run configuration; replaces the settings given as flags
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// ROIs of another channel as CHANNEL=PATH, renamed and exported alongside; repeatable
    #[arg(long = "extra-rois", value_parser = parse_channel_path)]
    pub extra_rois: Vec<(String, PathBuf)>,
    #[command(flatten)]
    pub pipeline: PipelineConfig,
}

#[derive(clap::Args)]
pub struct MeasureArgs {
    #[arg(long)]
    pub rois: PathBuf,
    #[arg(long)]
    pub calibration: PathBuf,
    /// CSV file to write
    #[arg(long)]
    pub output: PathBuf,
    #[arg(long)]
    pub hyperstack: bool,
}

fn parse_channel_path(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((channel, path)) if !channel.trim().is_empty() && !path.is_empty() => {
            Ok((channel.trim().to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected CHANNEL=PATH, got '{}'", s)),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Track(track_args) => track(track_args),
        Command::Measure(measure_args) => measure(measure_args),
    }
}

fn track(args: TrackArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => PipelineConfig::from_json(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => args.pipeline,
    };
    let rois = RoiStore::from_json(&args.rois)
        .with_context(|| format!("loading ROIs {}", args.rois.display()))?;
    if rois.is_empty() {
        bail!("no ROIs in {}", args.rois.display());
    }
    let calibration = Calibration::from_json(&args.calibration)
        .with_context(|| format!("loading calibration {}", args.calibration.display()))?;
    let measurements = match &args.measurements {
        Some(path) => Some(
            MeasurementTable::from_csv_path(path)
                .with_context(|| format!("loading measurements {}", path.display()))?,
        ),
        None => None,
    };

    let mut extra_rois = Vec::with_capacity(args.extra_rois.len());
    for (channel, path) in &args.extra_rois {
        let store = RoiStore::from_json(path)
            .with_context(|| format!("loading {} ROIs {}", channel, path.display()))?;
        extra_rois.push((channel.clone(), store));
    }

    let tracker = LapTracker::new(config.tracker.clone());
    info!(tracker = %tracker, "tracker configured");
    let mut ctx = RunContext::new(args.image.as_str(), args.out, rois, calibration);
    ctx.measurements = measurements;
    ctx.config = config;
    ctx.is_hyperstack = args.hyperstack;
    ctx.extra_rois = extra_rois;

    let outputs = run(&mut ctx, &tracker).context("tracking run failed")?;
    info!(
        tracks = outputs.n_tracks,
        exported = outputs.groups.len(),
        grey = outputs.n_unassigned,
        "done"
    );
    println!("{}", outputs.tracks_file.display());
    Ok(())
}

fn measure(args: MeasureArgs) -> Result<()> {
    let mut rois = RoiStore::from_json(&args.rois)
        .with_context(|| format!("loading ROIs {}", args.rois.display()))?;
    let calibration = Calibration::from_json(&args.calibration)
        .with_context(|| format!("loading calibration {}", args.calibration.display()))?;
    let table = measure_rois(&mut rois, &calibration, args.hyperstack)?;
    table
        .to_csv_path(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!(rows = table.len(), output = %args.output.display(), "ROIs measured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channel_path() {
        assert_eq!(
            parse_channel_path("dna=out/rois_dna.json").unwrap(),
            ("dna".to_string(), PathBuf::from("out/rois_dna.json"))
        );
        assert!(parse_channel_path("dna").is_err());
        assert!(parse_channel_path("=rois.json").is_err());
    }

    #[test]
    fn test_track_args() {
        let args = Args::try_parse_from([
            "celltrack", "track", "--rois", "r.json", "--calibration", "c.json", "--image", "a.tif",
            "--out", "out", "--extra-rois", "dna=d.json", "--extra-rois", "nuclei=n.json",
            "--max-frame-gap", "2", "--seed", "5",
        ])
        .unwrap();
        match args.command {
            Command::Track(track) => {
                assert_eq!(track.extra_rois.len(), 2);
                assert_eq!(track.extra_rois[1].0, "nuclei");
                assert_eq!(track.pipeline.tracker.max_frame_gap, 2);
                assert_eq!(track.pipeline.seed, Some(5));
                assert!(track.pipeline.rename_rois);
            }
            Command::Measure(_) => panic!("expected the track subcommand"),
        }
    }
}
