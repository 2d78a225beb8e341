//! Links segmented cells into tracks across the frames of a timelapse and exports,
//! per track, the names of the cell outlines (ROIs) it contains.
pub mod calibration;
pub mod color;
pub mod config;
pub mod export;
pub mod measurements;
pub mod pipeline;
pub mod reconcile;
pub mod roi;
pub mod track;
pub mod utils;
