//! Convergence bookkeeping and the default per-contact vector primitives.

pub mod convergence;
pub mod primitives;

pub use convergence::{Convergence, SolveStats};
pub use primitives::{copy_local_reaction, light_error_squared, perform_relaxation, squared_norm};
