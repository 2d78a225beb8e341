//! Segmented object outlines and their measurement
mod measure;
#[allow(clippy::module_inception)]
mod roi;

pub use self::{measure::*, roi::*};
