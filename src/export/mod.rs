//! Output files of a run
mod export_errors;
mod writer;

pub use self::{export_errors::*, writer::*};
