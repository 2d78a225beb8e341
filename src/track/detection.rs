use std::collections::{BTreeMap, HashMap};
use std::f64::consts::PI;

use uuid::Uuid;

use crate::measurements::{
    MeasurementTable, AREA_COLUMN, FRAME_COLUMN, SLICE_COLUMN, X_COLUMN, Y_COLUMN,
};
use crate::track::track_errors::TrackerError;
use crate::utils::{euclidean_distance, squared_distance, Point};

/// Point-in-time, point-in-space candidate object handed to the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    id: Uuid,
    // 1-based, as in the measurement table
    frame: usize,
    position: Point,
    radius: f64,
    timestamp: f64,
    source_index: usize,
}

impl Detection {
    pub fn new(
        frame: usize,
        x: f64,
        y: f64,
        radius: f64,
        timestamp: f64,
        source_index: usize,
    ) -> Self {
        Detection {
            id: Uuid::new_v4(),
            frame,
            position: Point::new(x, y),
            radius,
            timestamp,
            source_index,
        }
    }
    pub fn get_id(&self) -> Uuid {
        self.id
    }
    pub fn get_frame(&self) -> usize {
        self.frame
    }
    pub fn get_position(&self) -> Point {
        self.position
    }
    pub fn get_x(&self) -> f64 {
        self.position.x
    }
    pub fn get_y(&self) -> f64 {
        self.position.y
    }
    pub fn get_radius(&self) -> f64 {
        self.radius
    }
    pub fn get_timestamp(&self) -> f64 {
        self.timestamp
    }
    pub fn get_source_index(&self) -> usize {
        self.source_index
    }
    pub fn distance_to(&self, other: &Detection) -> f64 {
        euclidean_distance(&self.position, &other.position)
    }
    pub fn squared_distance_to(&self, other: &Detection) -> f64 {
        squared_distance(&self.position, &other.position)
    }
}

/// All detections of one run, grouped by frame.
///
/// Keeps an explicit side table from detection identity to the measurement row it
/// came from, so nothing has to be smuggled through an unrelated detection attribute.
#[derive(Debug, Clone, Default)]
pub struct DetectionSet {
    detections: HashMap<Uuid, Detection>,
    // frame -> ids in insertion order
    frames: BTreeMap<usize, Vec<Uuid>>,
    source_rows: HashMap<Uuid, usize>,
}

impl DetectionSet {
    pub fn new() -> Self {
        DetectionSet::default()
    }
    pub fn add(&mut self, detection: Detection) {
        let id = detection.get_id();
        self.frames.entry(detection.get_frame()).or_default().push(id);
        self.source_rows.insert(id, detection.get_source_index());
        self.detections.insert(id, detection);
    }
    pub fn len(&self) -> usize {
        self.detections.len()
    }
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
    pub fn get(&self, id: &Uuid) -> Option<&Detection> {
        self.detections.get(id)
    }
    /// Measurement row the detection was built from
    pub fn source_index_of(&self, id: &Uuid) -> Option<usize> {
        self.source_rows.get(id).copied()
    }
    /// Non-empty frames, ascending
    pub fn frames(&self) -> Vec<usize> {
        self.frames.keys().copied().collect()
    }
    pub fn in_frame(&self, frame: usize) -> Vec<&Detection> {
        match self.frames.get(&frame) {
            Some(ids) => ids.iter().filter_map(|id| self.detections.get(id)).collect(),
            None => Vec::new(),
        }
    }
    /// Iterates by frame ascending, then by insertion order within a frame
    pub fn iter(&self) -> impl Iterator<Item = &Detection> + '_ {
        self.frames
            .values()
            .flat_map(move |ids| ids.iter().filter_map(move |id| self.detections.get(id)))
    }
}

/// Largest frame number accepted in a measurement table
pub const MAX_FRAME: f64 = u32::MAX as f64;

/// Creates one detection per measurement row.
///
/// The object is treated as a disk of equivalent area, so `radius = sqrt(area / PI)`.
/// Frames are 1-based in the table, timestamps start at zero: `t = (frame - 1) * frame_interval`.
///
/// Basic usage:
///
/// ```
/// use celltrack_rs::measurements::MeasurementTable;
/// use celltrack_rs::track::detections_from_table;
/// let table = MeasurementTable::with_columns(vec![
///     ("Slice", vec![1.0, 2.0]),
///     ("XM", vec![0.0, 1.0]),
///     ("YM", vec![0.0, 1.0]),
///     ("Area", vec![std::f64::consts::PI, 4.0 * std::f64::consts::PI]),
/// ]).unwrap();
/// let detections = detections_from_table(&table, 2.0).unwrap();
/// assert_eq!(detections.len(), 2);
/// ```
pub fn detections_from_table(
    table: &MeasurementTable,
    frame_interval: f64,
) -> Result<DetectionSet, TrackerError> {
    let (_, frames) = table
        .frame_column()
        .ok_or_else(|| TrackerError::MissingColumn(format!("{}|{}", FRAME_COLUMN, SLICE_COLUMN)))?;
    let xs = table
        .column(X_COLUMN)
        .ok_or_else(|| TrackerError::MissingColumn(X_COLUMN.to_string()))?;
    let ys = table
        .column(Y_COLUMN)
        .ok_or_else(|| TrackerError::MissingColumn(Y_COLUMN.to_string()))?;
    let areas = table
        .column(AREA_COLUMN)
        .ok_or_else(|| TrackerError::MissingColumn(AREA_COLUMN.to_string()))?;
    // Uncalibrated images have an interval of 0: every timestamp is then 0
    if !frame_interval.is_finite() || frame_interval < 0.0 {
        return Err(TrackerError::BadValue(format!(
            "frame interval must be a non-negative number, got {}",
            frame_interval
        )));
    }

    // Validate everything first: no partial result on failure
    let mut rows = Vec::with_capacity(table.len());
    for i in 0..table.len() {
        let frame = frames[i];
        if !frame.is_finite() || frame < 1.0 || frame > MAX_FRAME || frame.fract() != 0.0 {
            return Err(TrackerError::BadValue(format!(
                "row {}: frame must be an integer in [1, {}], got {}",
                i, MAX_FRAME, frame
            )));
        }
        let area = areas[i];
        if !area.is_finite() || area < 0.0 {
            return Err(TrackerError::BadValue(format!(
                "row {}: area must be non-negative, got {}",
                i, area
            )));
        }
        if !xs[i].is_finite() || !ys[i].is_finite() {
            return Err(TrackerError::BadValue(format!(
                "row {}: centre of mass is not finite",
                i
            )));
        }
        rows.push((frame as usize, xs[i], ys[i], area));
    }

    let mut detections = DetectionSet::new();
    for (i, (frame, x, y, area)) in rows.into_iter().enumerate() {
        let t = (frame - 1) as f64 * frame_interval;
        let radius = f64::sqrt(area / PI);
        detections.add(Detection::new(frame, x, y, radius, t, i));
    }
    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(f64, f64, f64, f64)]) -> MeasurementTable {
        MeasurementTable::with_columns(vec![
            ("Slice", rows.iter().map(|r| r.0).collect()),
            ("XM", rows.iter().map(|r| r.1).collect()),
            ("YM", rows.iter().map(|r| r.2).collect()),
            ("Area", rows.iter().map(|r| r.3).collect()),
        ])
        .unwrap()
    }

    #[test]
    fn test_two_rows_scenario() {
        let t = table(&[(1.0, 0.0, 0.0, PI), (2.0, 1.0, 1.0, 4.0 * PI)]);
        let set = detections_from_table(&t, 2.0).unwrap();
        let dets: Vec<&Detection> = set.iter().collect();
        assert_eq!(dets.len(), 2);

        assert_eq!(dets[0].get_x(), 0.0);
        assert_eq!(dets[0].get_y(), 0.0);
        assert!((dets[0].get_radius() - 1.0).abs() < 1e-9);
        assert_eq!(dets[0].get_timestamp(), 0.0);
        assert_eq!(dets[0].get_source_index(), 0);

        assert_eq!(dets[1].get_x(), 1.0);
        assert_eq!(dets[1].get_y(), 1.0);
        assert!((dets[1].get_radius() - 2.0).abs() < 1e-9);
        assert_eq!(dets[1].get_timestamp(), 2.0);
        assert_eq!(dets[1].get_source_index(), 1);
    }

    #[test]
    fn test_radius_from_area() {
        let areas = [0.0, 0.5, 3.0, 17.25, 1234.5];
        let rows: Vec<(f64, f64, f64, f64)> = areas.iter().map(|a| (1.0, 0.0, 0.0, *a)).collect();
        let set = detections_from_table(&table(&rows), 1.0).unwrap();
        for det in set.iter() {
            let area = areas[det.get_source_index()];
            assert!((det.get_radius() - (area / PI).sqrt()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_timestamps_increase_with_frame() {
        let rows: Vec<(f64, f64, f64, f64)> = (1..=6).rev().map(|f| (f as f64, 0.0, 0.0, 1.0)).collect();
        let set = detections_from_table(&table(&rows), 0.25).unwrap();
        let stamps: Vec<f64> = set.iter().map(|d| d.get_timestamp()).collect();
        assert_eq!(stamps.len(), 6);
        for pair in stamps.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_side_table_matches_rows() {
        let rows = [(2.0, 5.0, 5.0, 1.0), (1.0, 4.0, 4.0, 1.0), (2.0, 9.0, 9.0, 1.0)];
        let set = detections_from_table(&table(&rows), 1.0).unwrap();
        let mut seen: Vec<usize> = set.iter().map(|d| set.source_index_of(&d.get_id()).unwrap()).collect();
        // frame 1 first, then frame 2 in row order
        assert_eq!(seen, vec![1, 0, 2]);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_missing_column_fails() {
        let t = MeasurementTable::with_columns(vec![
            ("Slice", vec![1.0]),
            ("XM", vec![0.0]),
            ("YM", vec![0.0]),
        ])
        .unwrap();
        match detections_from_table(&t, 1.0) {
            Err(TrackerError::MissingColumn(name)) => assert_eq!(name, "Area"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_bad_frame_fails_without_partial_result() {
        let t = table(&[(1.0, 0.0, 0.0, 1.0), (0.0, 0.0, 0.0, 1.0)]);
        assert!(matches!(detections_from_table(&t, 1.0), Err(TrackerError::BadValue(_))));
        let t = table(&[(1.0, 0.0, 0.0, 1.0), (1.0e19, 0.0, 0.0, 1.0)]);
        assert!(matches!(detections_from_table(&t, 1.0), Err(TrackerError::BadValue(_))));
    }

    #[test]
    fn test_zero_interval_gives_zero_timestamps() {
        let t = table(&[(1.0, 0.0, 0.0, 1.0), (3.0, 1.0, 0.0, 1.0)]);
        let set = detections_from_table(&t, 0.0).unwrap();
        assert!(set.iter().all(|d| d.get_timestamp() == 0.0));
        assert_eq!(set.frames(), vec![1, 3]);
        assert!(matches!(detections_from_table(&t, -1.0), Err(TrackerError::BadValue(_))));
    }
}
