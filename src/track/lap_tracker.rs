use std::collections::{BTreeMap, HashMap};
use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::track::detection::DetectionSet;
use crate::track::lap::{solve_sparse, Candidate};
use crate::track::track_errors::TrackerError;
use crate::track::track_model::{Link, TrackModel};

/// Anything able to turn a detection set into tracks.
pub trait Tracker {
    fn track(&self, detections: &DetectionSet) -> Result<TrackModel, TrackerError>;
}

/// Distance thresholds and policies of the LAP tracker.
/// Distances are in the same (calibrated) units as the detection positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct TrackerSettings {
    /// Frame to frame linking max. distance
    #[arg(long, default_value_t = 10.0)]
    pub linking_max_distance: f64,
    /// Gap closing max. distance
    #[arg(long, default_value_t = 15.0)]
    pub gap_closing_max_distance: f64,
    /// Max. frame difference bridged by gap closing: 2 bridges one missing frame,
    /// 3 bridges two. Values below 2 bridge nothing.
    #[arg(long, default_value_t = 3)]
    pub max_frame_gap: usize,
    /// Disable gap closing
    #[arg(long = "no-gap-closing", action = clap::ArgAction::SetFalse)]
    pub allow_gap_closing: bool,
    /// Disable track splitting
    #[arg(long = "no-splitting", action = clap::ArgAction::SetFalse)]
    pub allow_track_splitting: bool,
    /// Segment splitting max. distance
    #[arg(long, default_value_t = 7.0)]
    pub splitting_max_distance: f64,
    // Merging is never performed; kept so that settings files stay explicit about it
    #[arg(skip)]
    pub allow_track_merging: bool,
}

/// Largest accepted linking, gap closing or splitting distance
pub const MAX_DISTANCE: f64 = 1.0e5;

impl Default for TrackerSettings {
    fn default() -> Self {
        TrackerSettings {
            linking_max_distance: 10.0,
            gap_closing_max_distance: 15.0,
            max_frame_gap: 3,
            allow_gap_closing: true,
            allow_track_splitting: true,
            splitting_max_distance: 7.0,
            allow_track_merging: false,
        }
    }
}

impl TrackerSettings {
    pub fn validate(&self) -> Result<(), TrackerError> {
        let distances = [
            ("linking_max_distance", self.linking_max_distance),
            ("gap_closing_max_distance", self.gap_closing_max_distance),
            ("splitting_max_distance", self.splitting_max_distance),
        ];
        for (name, value) in distances {
            if !value.is_finite() || value <= 0.0 {
                return Err(TrackerError::BadSettings(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        if self.allow_gap_closing && self.max_frame_gap < 1 {
            return Err(TrackerError::BadSettings(
                "max_frame_gap must be at least 1 when gap closing is enabled".to_string(),
            ));
        }
        // Squared and scaled costs must stay far from the i64 range of the solver
        let largest = distances
            .iter()
            .map(|(_, value)| *value)
            .fold(0.0, f64::max);
        if largest > MAX_DISTANCE {
            return Err(TrackerError::BadSettings(format!(
                "distances must not exceed {}, got {}",
                MAX_DISTANCE, largest
            )));
        }
        if self.allow_track_merging {
            return Err(TrackerError::BadSettings(
                "track merging is not supported".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for TrackerSettings {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Linking max. distance: {}\n\tGap closing: {} (max. distance {}, max. frame gap {})\n\tSplitting: {} (max. distance {})",
            self.linking_max_distance,
            self.allow_gap_closing,
            self.gap_closing_max_distance,
            self.max_frame_gap,
            self.allow_track_splitting,
            self.splitting_max_distance
        )
    }
}

/// Linear assignment problem tracker.
///
/// Works in two passes: detections of consecutive frames are linked into segments,
/// then segment ends are bridged over missing frames (gap closing) and segment starts
/// are attached to the middle of other segments (splitting). Both passes are solved
/// as assignment problems over squared distances. Merging never happens.
pub struct LapTracker {
    settings: TrackerSettings,
}

impl LapTracker {
    /// Creates default instance of LapTracker
    ///
    /// Basic usage:
    ///
    /// ```
    /// use celltrack_rs::track::LapTracker;
    /// let tracker = LapTracker::default();
    /// ```
    pub fn default() -> Self {
        LapTracker {
            settings: TrackerSettings::default(),
        }
    }
    /// Creates new instance of LapTracker
    ///
    /// Basic usage:
    ///
    /// ```
    /// use celltrack_rs::track::{LapTracker, TrackerSettings};
    /// let settings = TrackerSettings {
    ///     linking_max_distance: 5.0,
    ///     ..TrackerSettings::default()
    /// };
    /// let tracker = LapTracker::new(settings);
    /// ```
    pub fn new(settings: TrackerSettings) -> Self {
        LapTracker { settings }
    }
    pub fn get_settings(&self) -> &TrackerSettings {
        &self.settings
    }
    pub fn check_input(&self, detections: &DetectionSet) -> Result<(), TrackerError> {
        self.settings.validate()?;
        if detections.is_empty() {
            return Err(TrackerError::NoDetections);
        }
        Ok(())
    }
    // Links detections of frame t to detections of frame t+1
    fn link_frame_to_frame(&self, detections: &DetectionSet) -> Vec<Link> {
        let max_cost = self.settings.linking_max_distance.powi(2);
        let mut links = Vec::new();
        for (frame, next_frame) in detections.frames().into_iter().tuple_windows() {
            if next_frame != frame + 1 {
                continue;
            }
            let sources = detections.in_frame(frame);
            let targets = detections.in_frame(next_frame);
            let mut candidates = Vec::new();
            for (i, source) in sources.iter().enumerate() {
                for (j, target) in targets.iter().enumerate() {
                    let cost = source.squared_distance_to(target);
                    if cost <= max_cost {
                        candidates.push(Candidate { row: i, col: j, cost });
                    }
                }
            }
            let alternatives = vec![max_cost; sources.len()];
            let matches = solve_sparse(sources.len(), targets.len(), &candidates, &alternatives);
            debug!(frame, next_frame, links = matches.len(), "frame to frame linking");
            for (i, j) in matches {
                links.push(Link {
                    source: sources[i].get_id(),
                    target: targets[j].get_id(),
                    cost: sources[i].squared_distance_to(targets[j]),
                });
            }
        }
        links
    }
    // Bridges segments over missing frames and attaches segment starts to other segments
    fn close_gaps_and_split(&self, detections: &DetectionSet, links: &[Link]) -> Vec<Link> {
        if !self.settings.allow_gap_closing && !self.settings.allow_track_splitting {
            return Vec::new();
        }
        let segments = segments_from_links(detections, links);
        let mut segment_of: HashMap<Uuid, usize> = HashMap::new();
        for (s, segment) in segments.iter().enumerate() {
            for id in segment {
                segment_of.insert(*id, s);
            }
        }
        // Columns: segment starts, indexed by frame
        let starts: Vec<Uuid> = segments.iter().map(|s| s[0]).collect();
        let mut starts_by_frame: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (col, id) in starts.iter().enumerate() {
            if let Some(det) = detections.get(id) {
                starts_by_frame.entry(det.get_frame()).or_default().push(col);
            }
        }

        let gap_cost = self.settings.gap_closing_max_distance.powi(2);
        let split_cost = self.settings.splitting_max_distance.powi(2);
        let mut rows: Vec<Uuid> = Vec::new();
        let mut alternatives: Vec<f64> = Vec::new();
        let mut candidates: Vec<Candidate> = Vec::new();

        for (s, segment) in segments.iter().enumerate() {
            let last = segment.len() - 1;
            for (k, id) in segment.iter().enumerate() {
                let source = match detections.get(id) {
                    Some(d) => d,
                    None => continue,
                };
                let (frames, max_cost) = if k == last {
                    if !self.settings.allow_gap_closing {
                        continue;
                    }
                    let first = source.get_frame().saturating_add(2);
                    let last = source.get_frame().saturating_add(self.settings.max_frame_gap);
                    if last < first {
                        continue;
                    }
                    (first..=last, gap_cost)
                } else {
                    if !self.settings.allow_track_splitting {
                        continue;
                    }
                    let next = source.get_frame().saturating_add(1);
                    (next..=next, split_cost)
                };
                let row = rows.len();
                let mut has_candidate = false;
                for (_, cols) in starts_by_frame.range(frames) {
                    for col in cols {
                        if segment_of.get(&starts[*col]) == Some(&s) {
                            continue;
                        }
                        let target = match detections.get(&starts[*col]) {
                            Some(d) => d,
                            None => continue,
                        };
                        let cost = source.squared_distance_to(target);
                        if cost <= max_cost {
                            candidates.push(Candidate { row, col: *col, cost });
                            has_candidate = true;
                        }
                    }
                }
                if has_candidate {
                    rows.push(*id);
                    alternatives.push(max_cost);
                }
            }
        }

        let matches = solve_sparse(rows.len(), starts.len(), &candidates, &alternatives);
        matches
            .into_iter()
            .filter_map(|(row, col)| {
                let source = detections.get(&rows[row])?;
                let target = detections.get(&starts[col])?;
                Some(Link {
                    source: source.get_id(),
                    target: target.get_id(),
                    cost: source.squared_distance_to(target),
                })
            })
            .collect()
    }
}

impl Tracker for LapTracker {
    fn track(&self, detections: &DetectionSet) -> Result<TrackModel, TrackerError> {
        self.check_input(detections)?;
        let mut links = self.link_frame_to_frame(detections);
        let n_frame_links = links.len();
        let extra = self.close_gaps_and_split(detections, &links);
        info!(
            detections = detections.len(),
            frame_links = n_frame_links,
            gap_and_split_links = extra.len(),
            "tracking done"
        );
        links.extend(extra);
        Ok(TrackModel::from_links(detections, links))
    }
}

impl fmt::Display for LapTracker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.settings)
    }
}

// Chains of frame-to-frame links. Every detection is in exactly one segment;
// segments are returned in detection set order of their first element.
fn segments_from_links(detections: &DetectionSet, links: &[Link]) -> Vec<Vec<Uuid>> {
    let mut successor: HashMap<Uuid, Uuid> = HashMap::new();
    let mut has_predecessor: HashMap<Uuid, bool> = HashMap::new();
    for link in links {
        successor.insert(link.source, link.target);
        has_predecessor.insert(link.target, true);
    }
    let mut segments = Vec::new();
    for detection in detections.iter() {
        let id = detection.get_id();
        if has_predecessor.contains_key(&id) {
            continue;
        }
        let mut segment = vec![id];
        let mut current = id;
        while let Some(next) = successor.get(&current) {
            segment.push(*next);
            current = *next;
        }
        segments.push(segment);
    }
    segments
}
