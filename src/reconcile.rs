//! Maps tracked detections back to their ROIs, colours the ROIs by track and groups
//! ROI names per track.
use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::{debug, warn};

use crate::color::{gradient_position, jet, Color};
use crate::roi::RoiStore;
use crate::track::{DetectionSet, NoRoiForDetection, TrackId, TrackModel, TrackerError};

/// Seeded generator when a seed is given, otherwise seeded from OS entropy
pub fn make_rng(seed: Option<u64>) -> Xoshiro256PlusPlus {
    match seed {
        Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
        None => Xoshiro256PlusPlus::from_entropy(),
    }
}

/// Shuffles the track ids and gives the i-th of n the Jet colour at `i / (n - 1)`
pub fn assign_track_colors<R: Rng + ?Sized>(
    track_ids: &[TrackId],
    rng: &mut R,
) -> HashMap<TrackId, Color> {
    let mut shuffled = track_ids.to_vec();
    shuffled.shuffle(rng);
    let count = shuffled.len();
    shuffled
        .into_iter()
        .enumerate()
        .map(|(i, id)| (id, jet(gradient_position(i, count))))
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub track_colors: HashMap<TrackId, Color>,
    /// ROI names per track, tracks in order of first appearance
    pub groups: Vec<(TrackId, Vec<String>)>,
    /// ROIs given the grey sentinel
    pub n_unassigned: usize,
}

/// Colours every ROI reached by a detection and groups ROI names by track.
///
/// Detections in no track, or in a track that is not visible, turn their ROI grey and
/// are left out of the groups. Detections are visited in detection set order and the
/// names keep that order within a group.
pub fn color_and_group_rois<R: Rng + ?Sized>(
    model: &TrackModel,
    detections: &DetectionSet,
    rois: &mut RoiStore,
    rng: &mut R,
) -> Result<Reconciliation, TrackerError> {
    let track_colors = assign_track_colors(&model.track_ids(true), rng);
    let mut groups: Vec<(TrackId, Vec<String>)> = Vec::new();
    let mut group_of: HashMap<TrackId, usize> = HashMap::new();
    let mut n_unassigned = 0;

    for detection in detections.iter() {
        let id = detection.get_id();
        let row = detections
            .source_index_of(&id)
            .ok_or(NoRoiForDetection {
                source_index: detection.get_source_index(),
            })?;
        let roi = rois
            .by_source_row_mut(row)
            .ok_or(NoRoiForDetection { source_index: row })?;

        let color = model
            .track_id_of(&id)
            .and_then(|track_id| track_colors.get(&track_id).map(|c| (track_id, *c)));
        match color {
            Some((track_id, color)) => {
                roi.set_fill_color(color);
                let g = *group_of.entry(track_id).or_insert_with(|| {
                    groups.push((track_id, Vec::new()));
                    groups.len() - 1
                });
                groups[g].1.push(roi.get_name().to_string());
            }
            None => {
                roi.set_fill_color(Color::GRAY);
                n_unassigned += 1;
            }
        }
    }
    if n_unassigned > 0 {
        warn!(n_unassigned, "ROIs outside any visible track left grey");
    }
    debug!(tracks = groups.len(), "ROIs grouped by track");
    Ok(Reconciliation {
        track_colors,
        groups,
        n_unassigned,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roi::Roi;
    use crate::track::{Detection, Link};

    fn roi(name: &str, frame: usize) -> Roi {
        Roi::new(name, frame, vec![0.0, 1.0, 1.0], vec![0.0, 0.0, 1.0])
    }

    #[test]
    fn test_single_track_group() {
        let mut set = DetectionSet::new();
        let a = Detection::new(1, 0.0, 0.0, 1.0, 0.0, 0);
        let b = Detection::new(2, 0.0, 0.0, 1.0, 1.0, 1);
        let link = Link { source: a.get_id(), target: b.get_id(), cost: 0.0 };
        set.add(a);
        set.add(b);
        let model = TrackModel::from_links(&set, vec![link]);
        let mut rois = RoiStore::from_rois(vec![roi("A", 1), roi("B", 2)]);
        let result = color_and_group_rois(&model, &set, &mut rois, &mut make_rng(Some(1))).unwrap();
        assert_eq!(result.groups, vec![(0, vec!["A".to_string(), "B".to_string()])]);
        assert_eq!(result.n_unassigned, 0);
        // single track: gradient position 0
        assert_eq!(rois.get(0).unwrap().get_fill_color(), Some(jet(0.0)));
        assert_eq!(rois.get(1).unwrap().get_fill_color(), Some(jet(0.0)));
    }

    #[test]
    fn test_untracked_detection_is_grey() {
        let mut set = DetectionSet::new();
        let a = Detection::new(1, 0.0, 0.0, 1.0, 0.0, 0);
        let b = Detection::new(2, 0.0, 0.0, 1.0, 1.0, 1);
        let lone = Detection::new(2, 50.0, 50.0, 1.0, 1.0, 2);
        let link = Link { source: a.get_id(), target: b.get_id(), cost: 0.0 };
        for d in [a, b, lone] {
            set.add(d);
        }
        let model = TrackModel::from_links(&set, vec![link]);
        let mut rois = RoiStore::from_rois(vec![roi("A", 1), roi("B", 2), roi("C", 2)]);
        let result = color_and_group_rois(&model, &set, &mut rois, &mut make_rng(Some(3))).unwrap();
        assert_eq!(rois.get(2).unwrap().get_fill_color(), Some(Color::GRAY));
        assert_eq!(result.n_unassigned, 1);
        assert!(result.groups.iter().all(|(_, names)| !names.contains(&"C".to_string())));
    }

    #[test]
    fn test_hidden_track_is_grey() {
        let mut set = DetectionSet::new();
        let a = Detection::new(1, 0.0, 0.0, 1.0, 0.0, 0);
        let b = Detection::new(2, 0.0, 0.0, 1.0, 1.0, 1);
        let link = Link { source: a.get_id(), target: b.get_id(), cost: 0.0 };
        set.add(a);
        set.add(b);
        let mut model = TrackModel::from_links(&set, vec![link]);
        model.set_visible(0, false);
        let mut rois = RoiStore::from_rois(vec![roi("A", 1), roi("B", 2)]);
        let result = color_and_group_rois(&model, &set, &mut rois, &mut make_rng(Some(3))).unwrap();
        assert!(result.groups.is_empty());
        assert_eq!(result.n_unassigned, 2);
    }

    #[test]
    fn test_missing_roi_fails() {
        let mut set = DetectionSet::new();
        set.add(Detection::new(1, 0.0, 0.0, 1.0, 0.0, 4));
        let model = TrackModel::from_links(&set, Vec::new());
        let mut rois = RoiStore::from_rois(vec![roi("A", 1)]);
        let res = color_and_group_rois(&model, &set, &mut rois, &mut make_rng(Some(3)));
        assert!(matches!(res, Err(TrackerError::NoRoi(_))));
    }

    #[test]
    fn test_same_seed_same_colors() {
        let ids: Vec<TrackId> = (0..12).collect();
        let first = assign_track_colors(&ids, &mut make_rng(Some(2024)));
        let second = assign_track_colors(&ids, &mut make_rng(Some(2024)));
        assert_eq!(first, second);
        assert_eq!(first.len(), 12);
        // a permutation: every gradient stop is used exactly once
        let mut used: Vec<Color> = first.values().copied().collect();
        let mut expected: Vec<Color> = (0..12).map(|i| jet(gradient_position(i, 12))).collect();
        used.sort_by_key(|c| (c.r, c.g, c.b));
        expected.sort_by_key(|c| (c.r, c.g, c.b));
        assert_eq!(used, expected);
    }
}
