//! Run configuration
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::export::ExportError;
use crate::track::{FeatureFilter, TrackFeature, TrackerSettings};

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { field: String, reason: String },
    Export(ExportError),
}

impl ConfigError {
    pub fn invalid_value<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<ExportError> for ConfigError {
    fn from(e: ExportError) -> Self {
        ConfigError::Export(e)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
            ConfigError::Export(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Track filter applied when nothing else is configured: only dividing lineages stay visible
pub fn default_track_filters() -> Vec<FeatureFilter> {
    vec![FeatureFilter::new(TrackFeature::NumberSplits, 0.9, true)]
}

/// Channel names end up in file names (`rois_<channel>.json`)
pub fn validate_channel(channel: &str) -> Result<(), ConfigError> {
    let channel = channel.trim();
    if channel.is_empty() {
        return Err(ConfigError::invalid_value("channel", "must not be empty"));
    }
    if channel.contains(|c: char| c == '/' || c == '\\') {
        return Err(ConfigError::invalid_value(
            "channel",
            format!("'{}' must not contain path separators", channel),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name of the tracked channel, used in output file names
    #[arg(long, default_value = "membrane")]
    pub channel: String,
    /// Track filter such as NUMBER_SPLITS>0.9; repeat to combine
    #[arg(long = "filter", default_value = "NUMBER_SPLITS>0.9")]
    pub track_filters: Vec<FeatureFilter>,
    /// Keep every track visible, ignoring the track filters
    #[arg(long)]
    pub keep_all_tracks: bool,
    /// Seed for the track colour shuffle; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,
    /// Keep ROI names as loaded instead of renaming them per frame
    #[arg(long = "no-rename", action = clap::ArgAction::SetFalse)]
    pub rename_rois: bool,
    #[command(flatten)]
    pub tracker: TrackerSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            channel: "membrane".to_string(),
            track_filters: default_track_filters(),
            keep_all_tracks: false,
            seed: None,
            rename_rois: true,
            tracker: TrackerSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Filters actually applied to the tracks
    pub fn effective_filters(&self) -> &[FeatureFilter] {
        if self.keep_all_tracks {
            &[]
        } else {
            &self.track_filters
        }
    }
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_channel(&self.channel)?;
        self.tracker
            .validate()
            .map_err(|e| ConfigError::invalid_value("tracker", e.to_string()))?;
        Ok(())
    }
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ExportError::io(path, e))?;
        let config: PipelineConfig = serde_json::from_str(&contents).map_err(ExportError::from)?;
        config.validate()?;
        Ok(config)
    }
    pub fn to_json(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self).map_err(ExportError::from)?;
        std::fs::write(path, json).map_err(|e| ExportError::io(path, e))?;
        Ok(())
    }
}
