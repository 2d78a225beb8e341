//! Tabular per-object measurements (one row per segmented object)
mod table;

pub use self::table::*;
