use std::collections::{HashMap, VecDeque};

use uuid::Uuid;

use crate::track::detection::DetectionSet;

pub type TrackId = usize;

/// Edge between two detections. `source` is always in an earlier frame than `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub source: Uuid,
    pub target: Uuid,
    // squared distance
    pub cost: f64,
}

#[derive(Debug, Clone)]
pub struct Track {
    id: TrackId,
    // Ordered the same way as the detection set iterates
    detections: Vec<Uuid>,
    links: Vec<Link>,
}

impl Track {
    pub fn get_id(&self) -> TrackId {
        self.id
    }
    pub fn get_detections(&self) -> &[Uuid] {
        &self.detections
    }
    pub fn get_links(&self) -> &[Link] {
        &self.links
    }
    pub fn len(&self) -> usize {
        self.detections.len()
    }
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

/// Result of a tracking run: tracks are the connected components of the link graph.
///
/// Detections without any link belong to no track.
#[derive(Debug, Clone, Default)]
pub struct TrackModel {
    tracks: Vec<Track>,
    track_of: HashMap<Uuid, TrackId>,
    visible: Vec<bool>,
}

impl TrackModel {
    /// Builds tracks from links. Track ids are assigned in the order the detection set
    /// iterates, so the track holding the earliest detection gets id 0.
    pub fn from_links(detections: &DetectionSet, links: Vec<Link>) -> Self {
        let mut adjacency: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for link in &links {
            adjacency.entry(link.source).or_default().push(link.target);
            adjacency.entry(link.target).or_default().push(link.source);
        }

        let mut track_of: HashMap<Uuid, TrackId> = HashMap::new();
        let mut tracks: Vec<Track> = Vec::new();
        for detection in detections.iter() {
            let start = detection.get_id();
            if track_of.contains_key(&start) || !adjacency.contains_key(&start) {
                continue;
            }
            let id = tracks.len();
            tracks.push(Track {
                id,
                detections: Vec::new(),
                links: Vec::new(),
            });
            let mut queue = VecDeque::from([start]);
            track_of.insert(start, id);
            while let Some(current) = queue.pop_front() {
                for next in adjacency.get(&current).into_iter().flatten() {
                    if !track_of.contains_key(next) {
                        track_of.insert(*next, id);
                        queue.push_back(*next);
                    }
                }
            }
        }
        for detection in detections.iter() {
            if let Some(id) = track_of.get(&detection.get_id()) {
                tracks[*id].detections.push(detection.get_id());
            }
        }
        for link in links {
            if let Some(id) = track_of.get(&link.source) {
                tracks[*id].links.push(link);
            }
        }
        let visible = vec![true; tracks.len()];
        TrackModel {
            tracks,
            track_of,
            visible,
        }
    }
    /// Track ids in ascending order. With `visible_only` the tracks rejected by
    /// filtering are left out.
    pub fn track_ids(&self, visible_only: bool) -> Vec<TrackId> {
        self.tracks
            .iter()
            .filter(|t| !visible_only || self.visible[t.id])
            .map(|t| t.id)
            .collect()
    }
    pub fn n_tracks(&self, visible_only: bool) -> usize {
        self.track_ids(visible_only).len()
    }
    /// Track of the given detection, if it was linked to anything
    pub fn track_id_of(&self, detection: &Uuid) -> Option<TrackId> {
        self.track_of.get(detection).copied()
    }
    pub fn get_track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(id)
    }
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }
    pub fn is_visible(&self, id: TrackId) -> bool {
        self.visible.get(id).copied().unwrap_or(false)
    }
    pub fn set_visible(&mut self, id: TrackId, visible: bool) {
        if let Some(v) = self.visible.get_mut(id) {
            *v = visible;
        }
    }
    pub fn n_links(&self) -> usize {
        self.tracks.iter().map(|t| t.links.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::detection::Detection;

    #[test]
    fn test_components_and_lone_detections() {
        let mut set = DetectionSet::new();
        let a1 = Detection::new(1, 0.0, 0.0, 1.0, 0.0, 0);
        let b1 = Detection::new(1, 50.0, 0.0, 1.0, 0.0, 1);
        let a2 = Detection::new(2, 1.0, 0.0, 1.0, 1.0, 2);
        let lone = Detection::new(2, 90.0, 90.0, 1.0, 1.0, 3);
        let b2 = Detection::new(2, 51.0, 0.0, 1.0, 1.0, 4);
        let ids = [a1.get_id(), b1.get_id(), a2.get_id(), lone.get_id(), b2.get_id()];
        for d in [a1, b1, a2, lone, b2] {
            set.add(d);
        }
        let links = vec![
            Link { source: ids[1], target: ids[4], cost: 1.0 },
            Link { source: ids[0], target: ids[2], cost: 1.0 },
        ];
        let model = TrackModel::from_links(&set, links);
        assert_eq!(model.track_ids(false), vec![0, 1]);
        assert_eq!(model.track_id_of(&ids[0]), Some(0));
        assert_eq!(model.track_id_of(&ids[2]), Some(0));
        assert_eq!(model.track_id_of(&ids[1]), Some(1));
        assert_eq!(model.track_id_of(&ids[4]), Some(1));
        assert_eq!(model.track_id_of(&ids[3]), None);
        assert_eq!(model.get_track(0).unwrap().get_detections(), &[ids[0], ids[2]]);
        assert_eq!(model.n_links(), 2);
    }

    #[test]
    fn test_visibility() {
        let mut set = DetectionSet::new();
        let a = Detection::new(1, 0.0, 0.0, 1.0, 0.0, 0);
        let b = Detection::new(2, 0.0, 0.0, 1.0, 1.0, 1);
        let link = Link { source: a.get_id(), target: b.get_id(), cost: 0.0 };
        set.add(a);
        set.add(b);
        let mut model = TrackModel::from_links(&set, vec![link]);
        assert_eq!(model.n_tracks(true), 1);
        model.set_visible(0, false);
        assert!(model.track_ids(true).is_empty());
        assert_eq!(model.track_ids(false), vec![0]);
    }
}
