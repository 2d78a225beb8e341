use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use tracing::debug;

use crate::export::ExportError;

/// Frame column written for hyperstacks
pub const FRAME_COLUMN: &str = "Frame";
/// Frame column written for plain stacks
pub const SLICE_COLUMN: &str = "Slice";
/// Centre of mass, x
pub const X_COLUMN: &str = "XM";
/// Centre of mass, y
pub const Y_COLUMN: &str = "YM";
pub const AREA_COLUMN: &str = "Area";

/// Numeric measurement table with named columns of equal length.
///
/// Rows keep their input order: the row ordinal is what detections refer back to.
#[derive(Debug, Clone, Default)]
pub struct MeasurementTable {
    headers: Vec<String>,
    columns: HashMap<String, Vec<f64>>,
    len: usize,
}

impl MeasurementTable {
    pub fn new() -> Self {
        MeasurementTable::default()
    }
    /// Builds a table from `(name, values)` pairs. All columns must have the same length.
    ///
    /// Basic usage:
    ///
    /// ```
    /// use celltrack_rs::measurements::MeasurementTable;
    /// let table = MeasurementTable::with_columns(vec![
    ///     ("Slice", vec![1.0, 2.0]),
    ///     ("XM", vec![0.0, 1.0]),
    ///     ("YM", vec![0.0, 1.0]),
    ///     ("Area", vec![3.0, 12.0]),
    /// ]).unwrap();
    /// assert_eq!(table.len(), 2);
    /// ```
    pub fn with_columns<S: Into<String>>(
        columns: Vec<(S, Vec<f64>)>,
    ) -> Result<Self, ExportError> {
        let mut table = MeasurementTable::new();
        for (name, values) in columns {
            table.insert_column(name, values)?;
        }
        Ok(table)
    }
    /// Adds (or replaces) a column
    pub fn insert_column<S: Into<String>>(
        &mut self,
        name: S,
        values: Vec<f64>,
    ) -> Result<(), ExportError> {
        let name = name.into();
        if !self.headers.is_empty() && values.len() != self.len {
            return Err(ExportError::BadRecord(format!(
                "column '{}' has {} rows, table has {}",
                name,
                values.len(),
                self.len
            )));
        }
        self.len = values.len();
        if !self.columns.contains_key(&name) {
            self.headers.push(name.clone());
        }
        self.columns.insert(name, values);
        Ok(())
    }
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(|v| v.as_slice())
    }
    /// Returns the frame column: `Frame` for hyperstacks, `Slice` for plain stacks.
    pub fn frame_column(&self) -> Option<(&'static str, &[f64])> {
        if let Some(frames) = self.column(FRAME_COLUMN) {
            return Some((FRAME_COLUMN, frames));
        }
        self.column(SLICE_COLUMN).map(|frames| (SLICE_COLUMN, frames))
    }

    /// Reads a results table written as CSV.
    ///
    /// Columns with a blank header (the row number column) and columns holding
    /// non-numeric text (labels) are skipped. Empty cells become NaN.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ExportError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
        let mut raw: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];
        let mut numeric = vec![true; headers.len()];
        for result in rdr.records() {
            let record = result?;
            for (i, cell) in record.iter().enumerate().take(headers.len()) {
                if !numeric[i] {
                    continue;
                }
                if cell.is_empty() {
                    raw[i].push(f64::NAN);
                    continue;
                }
                match cell.parse::<f64>() {
                    Ok(v) => raw[i].push(v),
                    Err(_) => numeric[i] = false,
                }
            }
        }
        let mut table = MeasurementTable::new();
        for ((name, values), is_numeric) in headers.into_iter().zip(raw).zip(numeric) {
            if name.is_empty() || !is_numeric {
                debug!(column = %name, "skipping non-numeric column");
                continue;
            }
            table.insert_column(name, values)?;
        }
        Ok(table)
    }
    pub fn from_csv_path(path: &Path) -> Result<Self, ExportError> {
        let file = std::fs::File::open(path).map_err(|e| ExportError::io(path, e))?;
        MeasurementTable::from_reader(file)
    }
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), ExportError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in 0..self.len {
            let record: Vec<String> = self
                .headers
                .iter()
                .map(|h| self.columns[h][row].to_string())
                .collect();
            wtr.write_record(&record)?;
        }
        wtr.flush().map_err(|e| ExportError::io("<csv writer>", e))?;
        Ok(())
    }
    pub fn to_csv_path(&self, path: &Path) -> Result<(), ExportError> {
        let file = std::fs::File::create(path).map_err(|e| ExportError::io(path, e))?;
        self.to_writer(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_imagej_results() {
        let data = " ,Label,Area,XM,YM,Slice\n1,t001-00001,12.5,3.0,4.0,1\n2,t002-00001,13.0,3.5,4.5,2\n";
        let table = MeasurementTable::from_reader(data.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.headers(), &["Area", "XM", "YM", "Slice"]);
        assert_eq!(table.column(AREA_COLUMN).unwrap(), &[12.5, 13.0]);
        let (name, frames) = table.frame_column().unwrap();
        assert_eq!(name, SLICE_COLUMN);
        assert_eq!(frames, &[1.0, 2.0]);
    }

    #[test]
    fn test_frame_preferred_over_slice() {
        let table = MeasurementTable::with_columns(vec![
            ("Slice", vec![3.0]),
            ("Frame", vec![1.0]),
        ])
        .unwrap();
        let (name, frames) = table.frame_column().unwrap();
        assert_eq!(name, FRAME_COLUMN);
        assert_eq!(frames, &[1.0]);
    }

    #[test]
    fn test_mismatched_column_length() {
        let res = MeasurementTable::with_columns(vec![("XM", vec![1.0, 2.0]), ("YM", vec![1.0])]);
        assert!(matches!(res, Err(ExportError::BadRecord(_))));
    }

    #[test]
    fn test_csv_write_then_read() {
        let table = MeasurementTable::with_columns(vec![
            ("Area", vec![1.5, 2.0]),
            ("Frame", vec![1.0, 2.0]),
        ])
        .unwrap();
        let mut buf = Vec::new();
        table.to_writer(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "Area,Frame\n1.5,1\n2,2\n");
        let back = MeasurementTable::from_reader(text.as_bytes()).unwrap();
        assert_eq!(back.column("Area").unwrap(), &[1.5, 2.0]);
    }
}
