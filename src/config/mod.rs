//! Solver configuration.

pub mod options;
pub use options::{SolverOptions, SweepMode, SweepOrder};
