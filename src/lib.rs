//! nsgs: local-problem toolkit and block-splitting engine for nonsmooth
//! Gauss-Seidel solvers.
//!
//! Large contact problems (3D friction, 2D Mohr-Coulomb plasticity, LCPs)
//! couple many contacts through one global matrix. This crate extracts the
//! per-contact local problems from that matrix whatever its storage layout,
//! hands them to a pluggable local solver described by a
//! [`LocalSolverToolkit`], folds the local results back into the global
//! reaction vector and provides the relaxation and error primitives the outer
//! sweep needs.

pub mod config;
pub mod core;
pub mod error;
pub mod local;
pub mod matrix;
pub mod problem;
pub mod solver;
pub mod toolkit;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use core::traits::*;
pub use error::*;
pub use local::{LocalMatrix, LocalProblem};
pub use matrix::{CsrMatrix, LinearOperator, NumericsMatrix, SparseBlockMatrix, StorageType};
pub use problem::*;
pub use solver::*;
pub use toolkit::*;

// Re-export SolveStats at the crate root for convenience
pub use utils::convergence::SolveStats;
