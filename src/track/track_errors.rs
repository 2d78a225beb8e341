use std::fmt;

#[derive(Debug)]
pub enum TrackerError {
    MissingColumn(String),
    BadValue(String),
    BadSettings(String),
    NoDetections,
    NoRoi(NoRoiForDetection),
}

impl From<NoRoiForDetection> for TrackerError {
    fn from(e: NoRoiForDetection) -> Self {
        TrackerError::NoRoi(e)
    }
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TrackerError::MissingColumn(name) => {
                write!(f, "Measurement table has no '{}' column", name)
            }
            TrackerError::BadValue(txt) => write!(f, "Bad measurement value: {}", txt),
            TrackerError::BadSettings(txt) => write!(f, "Bad tracker settings: {}", txt),
            TrackerError::NoDetections => write!(f, "The detection set is empty"),
            TrackerError::NoRoi(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for TrackerError {}

#[derive(Debug)]
pub struct NoRoiForDetection {
    pub source_index: usize,
}

impl fmt::Display for NoRoiForDetection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "NoRoiForDetection: measurement row {} has no matching ROI",
            self.source_index
        )
    }
}
