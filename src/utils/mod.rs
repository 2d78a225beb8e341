//! Geometry helpers shared by the tracker and the ROI measurements
#[allow(clippy::module_inception)]
mod utils;

pub use self::utils::*;
