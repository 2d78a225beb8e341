//! Export contents of `track` folder
mod detection;
mod features;
mod lap;
mod lap_tracker;
mod track_errors;
mod track_model;

pub use self::{
    detection::*,
    features::*,
    lap::{solve_sparse, Candidate},
    lap_tracker::*,
    track_errors::*,
    track_model::*,
};
