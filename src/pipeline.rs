//! One tracking run, from ROIs to the exported track groups
use std::fmt;
use std::path::PathBuf;

use tracing::info;

use crate::calibration::Calibration;
use crate::config::{validate_channel, ConfigError, PipelineConfig};
use crate::export::{image_basename, save_path, write_track_groups, ExportError};
use crate::measurements::MeasurementTable;
use crate::reconcile::{color_and_group_rois, make_rng};
use crate::roi::{measure_rois, RoiStore};
use crate::track::{
    compute_track_features, detections_from_table, filter_tracks, TrackId, Tracker, TrackerError,
};

pub const CALIBRATION_FILE: &str = "calibration.json";

#[derive(Debug)]
pub enum PipelineError {
    Tracker(TrackerError),
    Export(ExportError),
    Config(ConfigError),
    /// Number of frames found when at least two are needed
    NotATimelapse(usize),
}

impl From<TrackerError> for PipelineError {
    fn from(e: TrackerError) -> Self {
        PipelineError::Tracker(e)
    }
}

impl From<ExportError> for PipelineError {
    fn from(e: ExportError) -> Self {
        PipelineError::Export(e)
    }
}

impl From<ConfigError> for PipelineError {
    fn from(e: ConfigError) -> Self {
        PipelineError::Config(e)
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PipelineError::Tracker(e) => write!(f, "Tracking failed: {}", e),
            PipelineError::Export(e) => write!(f, "{}", e),
            PipelineError::Config(e) => write!(f, "{}", e),
            PipelineError::NotATimelapse(n) => {
                write!(f, "Not a timelapse: {} frame(s) with objects, need at least 2", n)
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Tracker(e) => Some(e),
            PipelineError::Export(e) => Some(e),
            PipelineError::Config(e) => Some(e),
            PipelineError::NotATimelapse(_) => None,
        }
    }
}

/// Everything a run reads. Nothing is taken from global state.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Image title; its basename names the output folder and the tracks file
    pub image_name: String,
    pub out_dir: PathBuf,
    pub rois: RoiStore,
    /// Measurements of the ROIs. Measured from the ROIs when absent.
    pub measurements: Option<MeasurementTable>,
    pub calibration: Calibration,
    pub config: PipelineConfig,
    pub is_hyperstack: bool,
    /// ROIs of other segmented channels, renamed and exported next to the tracked ones
    pub extra_rois: Vec<(String, RoiStore)>,
}

impl RunContext {
    pub fn new<S: Into<String>, P: Into<PathBuf>>(
        image_name: S,
        out_dir: P,
        rois: RoiStore,
        calibration: Calibration,
    ) -> Self {
        RunContext {
            image_name: image_name.into(),
            out_dir: out_dir.into(),
            rois,
            measurements: None,
            calibration,
            config: PipelineConfig::default(),
            is_hyperstack: false,
            extra_rois: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOutputs {
    pub tracks_file: PathBuf,
    pub rois_file: PathBuf,
    pub calibration_file: PathBuf,
    /// `rois_<channel>.json` of every extra channel, in input order
    pub extra_rois_files: Vec<PathBuf>,
    pub n_tracks: usize,
    pub n_visible_tracks: usize,
    /// ROIs left grey
    pub n_unassigned: usize,
    pub groups: Vec<(TrackId, Vec<String>)>,
}

/// Runs the whole chain: rename and measure ROIs, build detections, track, filter
/// tracks, colour ROIs and write the output files. The ROIs in `ctx` end up renamed,
/// re-keyed and coloured.
pub fn run(ctx: &mut RunContext, tracker: &dyn Tracker) -> Result<RunOutputs, PipelineError> {
    ctx.config.validate()?;
    ctx.calibration.validate()?;
    let mut channels = vec![ctx.config.channel.trim()];
    for (channel, _) in &ctx.extra_rois {
        validate_channel(channel)?;
        if channels.contains(&channel.trim()) {
            return Err(ConfigError::invalid_value(
                "channel",
                format!("'{}' is given more than once", channel.trim()),
            )
            .into());
        }
        channels.push(channel.trim());
    }
    let n_frames = ctx.rois.n_frames();
    if n_frames < 2 {
        return Err(PipelineError::NotATimelapse(n_frames));
    }
    info!(image = %ctx.image_name, rois = ctx.rois.len(), frames = n_frames, "run started");

    let calibration_file = save_path(&ctx.out_dir, &ctx.image_name, CALIBRATION_FILE)?;
    ctx.calibration.to_json(&calibration_file)?;

    if ctx.config.rename_rois {
        ctx.rois.rename_by_frame();
        for (_, rois) in ctx.extra_rois.iter_mut() {
            rois.rename_by_frame();
        }
    }
    let table = match ctx.measurements.take() {
        Some(table) => table,
        None => {
            let table = measure_rois(&mut ctx.rois, &ctx.calibration, ctx.is_hyperstack)?;
            info!(rows = table.len(), "ROIs measured");
            table
        }
    };

    let detections = detections_from_table(&table, ctx.calibration.frame_interval)?;
    ctx.measurements = Some(table);
    info!(detections = detections.len(), "detections built");

    let mut model = tracker.track(&detections)?;
    let features = compute_track_features(&model, &detections);
    let filters = ctx.config.effective_filters();
    let n_visible_tracks = filter_tracks(&mut model, &features, filters);
    info!(
        tracks = model.n_tracks(false),
        visible = n_visible_tracks,
        filters = filters.len(),
        "tracks filtered"
    );

    let mut rng = make_rng(ctx.config.seed);
    let reconciliation = color_and_group_rois(&model, &detections, &mut ctx.rois, &mut rng)?;

    let basename = image_basename(&ctx.image_name);
    let tracks_file = save_path(&ctx.out_dir, &ctx.image_name, &format!("{}_tracks.csv", basename))?;
    write_track_groups(&tracks_file, &reconciliation.groups)?;
    let rois_file = save_path(
        &ctx.out_dir,
        &ctx.image_name,
        &format!("rois_{}.json", ctx.config.channel.trim()),
    )?;
    ctx.rois.to_json(&rois_file)?;
    let mut extra_rois_files = Vec::with_capacity(ctx.extra_rois.len());
    for (channel, rois) in &ctx.extra_rois {
        let path = save_path(
            &ctx.out_dir,
            &ctx.image_name,
            &format!("rois_{}.json", channel.trim()),
        )?;
        rois.to_json(&path)?;
        extra_rois_files.push(path);
    }
    info!(
        tracks_file = %tracks_file.display(),
        rois_file = %rois_file.display(),
        groups = reconciliation.groups.len(),
        extra_channels = extra_rois_files.len(),
        "results written"
    );

    Ok(RunOutputs {
        tracks_file,
        rois_file,
        calibration_file,
        extra_rois_files,
        n_tracks: model.n_tracks(false),
        n_visible_tracks,
        n_unassigned: reconciliation.n_unassigned,
        groups: reconciliation.groups,
    })
}
