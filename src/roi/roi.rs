use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::export::ExportError;

/// Segmented object outline in pixel coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Roi {
    name: String,
    // 1-based frame
    position: usize,
    xs: Vec<f64>,
    ys: Vec<f64>,
    fill_color: Option<Color>,
    // Measurement row this ROI produced
    source_row: Option<usize>,
}

impl Roi {
    pub fn new<S: Into<String>>(name: S, position: usize, xs: Vec<f64>, ys: Vec<f64>) -> Self {
        Roi {
            name: name.into(),
            position,
            xs,
            ys,
            fill_color: None,
            source_row: None,
        }
    }
    pub fn with_source_row(mut self, row: usize) -> Self {
        self.source_row = Some(row);
        self
    }
    pub fn get_name(&self) -> &str {
        &self.name
    }
    pub fn get_position(&self) -> usize {
        self.position
    }
    pub fn get_xs(&self) -> &[f64] {
        &self.xs
    }
    pub fn get_ys(&self) -> &[f64] {
        &self.ys
    }
    pub fn get_fill_color(&self) -> Option<Color> {
        self.fill_color
    }
    pub fn set_fill_color(&mut self, color: Color) {
        self.fill_color = Some(color)
    }
    pub fn get_source_row(&self) -> Option<usize> {
        self.source_row
    }
}

/// On-disk form of a ROI: `{"t": frame, "x": [...], "y": [...]}` keyed by name
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoiRecord {
    t: usize,
    x: Vec<f64>,
    y: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    row: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fill: Option<Color>,
}

/// Ordered ROI collection with an explicit measurement-row key per ROI.
///
/// Lookups by row go through the key map, never through the position in the store.
#[derive(Debug, Clone, Default)]
pub struct RoiStore {
    rois: Vec<Roi>,
    by_row: HashMap<usize, usize>,
}

impl RoiStore {
    /// ROIs without a row key get their ordinal position as key
    pub fn from_rois(mut rois: Vec<Roi>) -> Self {
        for (i, roi) in rois.iter_mut().enumerate() {
            if roi.source_row.is_none() {
                roi.source_row = Some(i);
            }
        }
        let mut store = RoiStore {
            rois,
            by_row: HashMap::new(),
        };
        store.rebuild_index();
        store
    }
    fn rebuild_index(&mut self) {
        self.by_row = self
            .rois
            .iter()
            .enumerate()
            .filter_map(|(i, roi)| roi.source_row.map(|row| (row, i)))
            .collect();
    }
    pub fn len(&self) -> usize {
        self.rois.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }
    pub fn iter(&self) -> std::slice::Iter<'_, Roi> {
        self.rois.iter()
    }
    pub fn get(&self, index: usize) -> Option<&Roi> {
        self.rois.get(index)
    }
    pub fn by_source_row(&self, row: usize) -> Option<&Roi> {
        self.by_row.get(&row).and_then(|i| self.rois.get(*i))
    }
    pub fn by_source_row_mut(&mut self, row: usize) -> Option<&mut Roi> {
        match self.by_row.get(&row) {
            Some(i) => self.rois.get_mut(*i),
            None => None,
        }
    }
    /// Re-keys every ROI with its current position
    pub fn assign_source_rows(&mut self) {
        for (i, roi) in self.rois.iter_mut().enumerate() {
            roi.source_row = Some(i);
        }
        self.rebuild_index();
    }
    /// Number of distinct frames holding at least one ROI
    pub fn n_frames(&self) -> usize {
        self.rois.iter().map(|r| r.position).unique().count()
    }
    /// Renames ROIs `t{frame:03}-{k:05}`, k counting from 1 and restarting whenever the
    /// frame differs from the previous ROI's frame.
    pub fn rename_by_frame(&mut self) {
        let mut k = 1;
        let mut last_frame = None;
        for roi in self.rois.iter_mut() {
            if last_frame != Some(roi.position) {
                last_frame = Some(roi.position);
                k = 1;
            }
            roi.name = format!("t{:03}-{:05}", roi.position, k);
            k += 1;
        }
    }

    /// Loads ROIs from a JSON object keyed by ROI name. The store is ordered by frame, then name.
    pub fn from_json_str(json: &str) -> Result<Self, ExportError> {
        let records: BTreeMap<String, RoiRecord> = serde_json::from_str(json)?;
        let mut rois = Vec::with_capacity(records.len());
        for (name, record) in records {
            if record.x.len() != record.y.len() {
                return Err(ExportError::BadRecord(format!(
                    "ROI '{}' has {} x and {} y coordinates",
                    name,
                    record.x.len(),
                    record.y.len()
                )));
            }
            if record.t < 1 {
                return Err(ExportError::BadRecord(format!(
                    "ROI '{}' has frame {}, frames start at 1",
                    name, record.t
                )));
            }
            rois.push(Roi {
                name,
                position: record.t,
                xs: record.x,
                ys: record.y,
                fill_color: record.fill,
                source_row: record.row,
            });
        }
        rois.sort_by_key(|roi| roi.position);
        let store = RoiStore::from_rois(rois);
        // Keys must stay unique or lookups would silently pick one of them
        if store.by_row.len() != store.rois.len() {
            return Err(ExportError::BadRecord("duplicate ROI row keys".to_string()));
        }
        Ok(store)
    }
    pub fn from_json(path: &Path) -> Result<Self, ExportError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ExportError::io(path, e))?;
        RoiStore::from_json_str(&contents)
    }
    pub fn to_json_string(&self) -> Result<String, ExportError> {
        let records: BTreeMap<&str, RoiRecord> = self
            .rois
            .iter()
            .map(|roi| {
                (
                    roi.name.as_str(),
                    RoiRecord {
                        t: roi.position,
                        x: roi.xs.clone(),
                        y: roi.ys.clone(),
                        row: roi.source_row,
                        fill: roi.fill_color,
                    },
                )
            })
            .collect();
        if records.len() != self.rois.len() {
            return Err(ExportError::BadRecord("duplicate ROI names".to_string()));
        }
        Ok(serde_json::to_string(&records)?)
    }
    pub fn to_json(&self, path: &Path) -> Result<(), ExportError> {
        let json = self.to_json_string()?;
        std::fs::write(path, json).map_err(|e| ExportError::io(path, e))
    }
}
