//! Pixel and time calibration of an image
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::export::ExportError;

/// Physical size of a pixel and time between frames.
///
/// Serialized with the short keys used by the calibration file:
/// `{"w": .., "w_unit": .., "h": .., "h_unit": .., "t": .., "t_unit": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    #[serde(rename = "w")]
    pub pixel_width: f64,
    #[serde(rename = "w_unit")]
    pub x_unit: String,
    #[serde(rename = "h")]
    pub pixel_height: f64,
    #[serde(rename = "h_unit")]
    pub y_unit: String,
    #[serde(rename = "t")]
    pub frame_interval: f64,
    #[serde(rename = "t_unit")]
    pub time_unit: String,
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration {
            pixel_width: 1.0,
            x_unit: "pixel".to_string(),
            pixel_height: 1.0,
            y_unit: "pixel".to_string(),
            frame_interval: 1.0,
            time_unit: "frame".to_string(),
        }
    }
}

impl Calibration {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("w", self.pixel_width), ("h", self.pixel_height)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::invalid_value(
                    field,
                    format!("must be a positive number, got {}", value),
                ));
            }
        }
        // 0 is what uncalibrated timelapses carry
        if !self.frame_interval.is_finite() || self.frame_interval < 0.0 {
            return Err(ConfigError::invalid_value(
                "t",
                format!("must be a non-negative number, got {}", self.frame_interval),
            ));
        }
        Ok(())
    }
    /// Area of one pixel in calibrated units
    pub fn pixel_area(&self) -> f64 {
        self.pixel_width * self.pixel_height
    }
    /// Reads and validates a calibration file. Missing fields are an error.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ExportError::io(path, e))?;
        let calibration: Calibration =
            serde_json::from_str(&contents).map_err(ExportError::from)?;
        calibration.validate()?;
        Ok(calibration)
    }
    pub fn to_json(&self, path: &Path) -> Result<(), ExportError> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json).map_err(|e| ExportError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_keys() {
        let cal = Calibration {
            pixel_width: 0.5,
            x_unit: "micron".to_string(),
            pixel_height: 0.25,
            y_unit: "micron".to_string(),
            frame_interval: 300.0,
            time_unit: "sec".to_string(),
        };
        let value = serde_json::to_value(&cal).unwrap();
        assert_eq!(value["w"], 0.5);
        assert_eq!(value["h_unit"], "micron");
        assert_eq!(value["t"], 300.0);
        assert_eq!(value["t_unit"], "sec");
        assert_eq!(cal.pixel_area(), 0.125);
    }

    #[test]
    fn test_missing_field_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        std::fs::write(&path, r#"{"w": 1.0, "w_unit": "px", "h": 1.0, "h_unit": "px", "t_unit": "s"}"#).unwrap();
        assert!(Calibration::from_json(&path).is_err());
    }

    #[test]
    fn test_uncalibrated_interval_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        std::fs::write(
            &path,
            r#"{"w": 1, "w_unit": "pixel", "h": 1, "h_unit": "pixel", "t": 0.0, "t_unit": "sec"}"#,
        )
        .unwrap();
        let cal = Calibration::from_json(&path).unwrap();
        assert_eq!(cal.frame_interval, 0.0);

        let negative = Calibration {
            frame_interval: -1.0,
            ..Calibration::default()
        };
        assert!(matches!(negative.validate(), Err(ConfigError::InvalidValue { .. })));
        let flat = Calibration {
            pixel_width: 0.0,
            ..Calibration::default()
        };
        assert!(flat.validate().is_err());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        let cal = Calibration::default();
        cal.to_json(&path).unwrap();
        assert_eq!(Calibration::from_json(&path).unwrap(), cal);
    }
}
