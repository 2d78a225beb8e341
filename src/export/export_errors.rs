use std::fmt;
use std::path::PathBuf;

/// Failures while reading or writing any of the run's files.
#[derive(Debug)]
pub enum ExportError {
    Io { path: PathBuf, source: std::io::Error },
    Json(serde_json::Error),
    Csv(csv::Error),
    BadRecord(String),
}

impl ExportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        ExportError::Json(e)
    }
}

impl From<csv::Error> for ExportError {
    fn from(e: csv::Error) -> Self {
        ExportError::Csv(e)
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExportError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            ExportError::Json(e) => write!(f, "JSON: {}", e),
            ExportError::Csv(e) => write!(f, "CSV: {}", e),
            ExportError::BadRecord(txt) => write!(f, "Bad record: {}", txt),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io { source, .. } => Some(source),
            ExportError::Json(e) => Some(e),
            ExportError::Csv(e) => Some(e),
            ExportError::BadRecord(_) => None,
        }
    }
}
