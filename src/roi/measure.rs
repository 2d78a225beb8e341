use crate::calibration::Calibration;
use crate::export::ExportError;
use crate::measurements::{
    MeasurementTable, AREA_COLUMN, FRAME_COLUMN, SLICE_COLUMN, X_COLUMN, Y_COLUMN,
};
use crate::roi::RoiStore;
use crate::utils::{polygon_area, polygon_centroid};

/// Measures area, centre of mass and frame of every ROI, one row per ROI in store order.
///
/// Values are in calibrated units. Each ROI is re-keyed with the row it produced, so
/// the detections built from the table can be traced back to their outline.
/// The frame column is named `Frame` for hyperstacks and `Slice` otherwise.
pub fn measure_rois(
    store: &mut RoiStore,
    calibration: &Calibration,
    is_hyperstack: bool,
) -> Result<MeasurementTable, ExportError> {
    store.assign_source_rows();
    let n = store.len();
    let mut areas = Vec::with_capacity(n);
    let mut xs = Vec::with_capacity(n);
    let mut ys = Vec::with_capacity(n);
    let mut frames = Vec::with_capacity(n);
    for roi in store.iter() {
        let area = polygon_area(roi.get_xs(), roi.get_ys());
        let center = polygon_centroid(roi.get_xs(), roi.get_ys());
        areas.push(area * calibration.pixel_area());
        xs.push(center.x * calibration.pixel_width);
        ys.push(center.y * calibration.pixel_height);
        frames.push(roi.get_position() as f64);
    }
    let frame_column = if is_hyperstack {
        FRAME_COLUMN
    } else {
        SLICE_COLUMN
    };
    MeasurementTable::with_columns(vec![
        (AREA_COLUMN, areas),
        (X_COLUMN, xs),
        (Y_COLUMN, ys),
        (frame_column, frames),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roi::Roi;

    #[test]
    fn test_measure_calibrated() {
        let mut store = RoiStore::from_rois(vec![
            Roi::new("b", 2, vec![10.0, 14.0, 14.0, 10.0], vec![0.0, 0.0, 2.0, 2.0]).with_source_row(7),
            Roi::new("a", 1, vec![0.0, 4.0, 4.0, 0.0], vec![0.0, 0.0, 4.0, 4.0]),
        ]);
        let cal = Calibration {
            pixel_width: 0.5,
            pixel_height: 2.0,
            ..Calibration::default()
        };
        let table = measure_rois(&mut store, &cal, false).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.column(AREA_COLUMN).unwrap(), &[8.0, 16.0]);
        assert_eq!(table.column(X_COLUMN).unwrap(), &[6.0, 1.0]);
        assert_eq!(table.column(Y_COLUMN).unwrap(), &[2.0, 4.0]);
        assert_eq!(table.column(SLICE_COLUMN).unwrap(), &[2.0, 1.0]);
        assert!(table.column(FRAME_COLUMN).is_none());
        // re-keyed by row
        assert_eq!(store.by_source_row(0).unwrap().get_name(), "b");
        assert!(store.by_source_row(7).is_none());
    }

    #[test]
    fn test_hyperstack_uses_frame_column() {
        let mut store = RoiStore::from_rois(vec![Roi::new("a", 3, vec![0.0, 1.0, 1.0], vec![0.0, 0.0, 1.0])]);
        let table = measure_rois(&mut store, &Calibration::default(), true).unwrap();
        assert_eq!(table.column(FRAME_COLUMN).unwrap(), &[3.0]);
    }
}
