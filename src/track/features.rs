use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::track::detection::DetectionSet;
use crate::track::track_model::{TrackId, TrackModel};

/// Numeric per-track features usable in filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackFeature {
    NumberSpots,
    NumberGaps,
    /// In frames
    LongestGap,
    NumberSplits,
    NumberMerges,
    TrackStart,
    TrackStop,
    TrackDuration,
    TrackDisplacement,
    TrackMeanSpeed,
}

impl TrackFeature {
    pub const ALL: [TrackFeature; 10] = [
        TrackFeature::NumberSpots,
        TrackFeature::NumberGaps,
        TrackFeature::LongestGap,
        TrackFeature::NumberSplits,
        TrackFeature::NumberMerges,
        TrackFeature::TrackStart,
        TrackFeature::TrackStop,
        TrackFeature::TrackDuration,
        TrackFeature::TrackDisplacement,
        TrackFeature::TrackMeanSpeed,
    ];
    pub fn key(&self) -> &'static str {
        match self {
            TrackFeature::NumberSpots => "NUMBER_SPOTS",
            TrackFeature::NumberGaps => "NUMBER_GAPS",
            TrackFeature::LongestGap => "LONGEST_GAP",
            TrackFeature::NumberSplits => "NUMBER_SPLITS",
            TrackFeature::NumberMerges => "NUMBER_MERGES",
            TrackFeature::TrackStart => "TRACK_START",
            TrackFeature::TrackStop => "TRACK_STOP",
            TrackFeature::TrackDuration => "TRACK_DURATION",
            TrackFeature::TrackDisplacement => "TRACK_DISPLACEMENT",
            TrackFeature::TrackMeanSpeed => "TRACK_MEAN_SPEED",
        }
    }
}

impl fmt::Display for TrackFeature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for TrackFeature {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrackFeature::ALL
            .iter()
            .find(|f| f.key().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("unknown track feature '{}'", s))
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrackFeatures {
    values: HashMap<TrackFeature, f64>,
}

impl TrackFeatures {
    pub fn get(&self, feature: TrackFeature) -> f64 {
        self.values.get(&feature).copied().unwrap_or(f64::NAN)
    }
    fn set(&mut self, feature: TrackFeature, value: f64) {
        self.values.insert(feature, value);
    }
}

/// Computes all features of every track in the model
pub fn compute_track_features(
    model: &TrackModel,
    detections: &DetectionSet,
) -> HashMap<TrackId, TrackFeatures> {
    let mut result = HashMap::new();
    for track in model.tracks() {
        let mut features = TrackFeatures::default();
        let mut successors: HashMap<Uuid, usize> = HashMap::new();
        let mut predecessors: HashMap<Uuid, usize> = HashMap::new();
        let mut n_gaps = 0;
        let mut longest_gap = 0;
        let mut speed_sum = 0.0;
        let mut speed_count = 0;
        for link in track.get_links() {
            *successors.entry(link.source).or_default() += 1;
            *predecessors.entry(link.target).or_default() += 1;
            let (source, target) = match (detections.get(&link.source), detections.get(&link.target)) {
                (Some(s), Some(t)) => (s, t),
                _ => continue,
            };
            let frame_gap = target.get_frame().saturating_sub(source.get_frame());
            if frame_gap > 1 {
                n_gaps += 1;
                longest_gap = usize::max(longest_gap, frame_gap - 1);
            }
            let dt = target.get_timestamp() - source.get_timestamp();
            if dt > 0.0 {
                speed_sum += source.distance_to(target) / dt;
                speed_count += 1;
            }
        }
        let n_splits = successors.values().filter(|n| **n > 1).count();
        let n_merges = predecessors.values().filter(|n| **n > 1).count();

        let members: Vec<_> = track
            .get_detections()
            .iter()
            .filter_map(|id| detections.get(id))
            .collect();
        let first = members
            .iter()
            .min_by(|a, b| a.get_timestamp().total_cmp(&b.get_timestamp()));
        let last = members
            .iter()
            .rev()
            .max_by(|a, b| a.get_timestamp().total_cmp(&b.get_timestamp()));

        features.set(TrackFeature::NumberSpots, members.len() as f64);
        features.set(TrackFeature::NumberGaps, n_gaps as f64);
        features.set(TrackFeature::LongestGap, longest_gap as f64);
        features.set(TrackFeature::NumberSplits, n_splits as f64);
        features.set(TrackFeature::NumberMerges, n_merges as f64);
        if let (Some(first), Some(last)) = (first, last) {
            features.set(TrackFeature::TrackStart, first.get_timestamp());
            features.set(TrackFeature::TrackStop, last.get_timestamp());
            features.set(
                TrackFeature::TrackDuration,
                last.get_timestamp() - first.get_timestamp(),
            );
            features.set(TrackFeature::TrackDisplacement, first.distance_to(last));
        }
        let mean_speed = if speed_count > 0 {
            speed_sum / speed_count as f64
        } else {
            0.0
        };
        features.set(TrackFeature::TrackMeanSpeed, mean_speed);
        result.insert(track.get_id(), features);
    }
    result
}

/// Keeps tracks whose feature is strictly above (`is_above`) or strictly below the value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureFilter {
    pub feature: TrackFeature,
    pub value: f64,
    pub is_above: bool,
}

impl FeatureFilter {
    pub fn new(feature: TrackFeature, value: f64, is_above: bool) -> Self {
        FeatureFilter {
            feature,
            value,
            is_above,
        }
    }
    pub fn accepts(&self, features: &TrackFeatures) -> bool {
        let v = features.get(self.feature);
        if self.is_above {
            v > self.value
        } else {
            v < self.value
        }
    }
}

impl fmt::Display for FeatureFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let op = if self.is_above { '>' } else { '<' };
        write!(f, "{}{}{}", self.feature, op, self.value)
    }
}

/// Parses `FEATURE>value` or `FEATURE<value`, e.g. `NUMBER_SPLITS>0.9`
impl FromStr for FeatureFilter {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (pos, is_above) = match (s.find('>'), s.find('<')) {
            (Some(p), None) => (p, true),
            (None, Some(p)) => (p, false),
            _ => return Err(format!("filter '{}' must look like FEATURE>value or FEATURE<value", s)),
        };
        let feature = TrackFeature::from_str(&s[..pos])?;
        let value = s[pos + 1..]
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("filter '{}': {}", s, e))?;
        Ok(FeatureFilter::new(feature, value, is_above))
    }
}

/// Marks every track visible or not according to the filters (all must accept).
/// Returns the number of visible tracks.
pub fn filter_tracks(
    model: &mut TrackModel,
    features: &HashMap<TrackId, TrackFeatures>,
    filters: &[FeatureFilter],
) -> usize {
    let mut n_visible = 0;
    for id in model.track_ids(false) {
        let keep = match features.get(&id) {
            Some(f) => filters.iter().all(|filter| filter.accepts(f)),
            None => filters.is_empty(),
        };
        model.set_visible(id, keep);
        if keep {
            n_visible += 1;
        }
    }
    n_visible
}
