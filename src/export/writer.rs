use std::path::{Path, PathBuf};

use crate::export::ExportError;
use crate::track::TrackId;

/// Image title without its extension (`"movie.tif"` gives `"movie"`)
pub fn image_basename(image_name: &str) -> String {
    let path = Path::new(image_name);
    match path.file_stem() {
        Some(stem) if path.extension().is_some() => stem.to_string_lossy().into_owned(),
        _ => image_name.to_string(),
    }
}

/// Path of `file_name` inside `<out_dir>/<image basename>/`. The folder is created when missing.
pub fn save_path(out_dir: &Path, image_name: &str, file_name: &str) -> Result<PathBuf, ExportError> {
    let folder = out_dir.join(image_basename(image_name));
    std::fs::create_dir_all(&folder).map_err(|e| ExportError::io(&folder, e))?;
    Ok(folder.join(file_name))
}

/// One line per track: ROI names joined by `", "`, every line ending in a newline.
pub fn format_track_groups(groups: &[(TrackId, Vec<String>)]) -> String {
    let mut out = String::new();
    for (_, names) in groups {
        out.push_str(&names.join(", "));
        out.push('\n');
    }
    out
}

/// Writes the track groups in one go; nothing is written for an empty list but the file is created.
pub fn write_track_groups(path: &Path, groups: &[(TrackId, Vec<String>)]) -> Result<(), ExportError> {
    std::fs::write(path, format_track_groups(groups)).map_err(|e| ExportError::io(path, e))
}
