//! Outer solvers built on the local-problem toolkit.

use crate::error::NsError;
use crate::problem::{GlobalProblem, ProblemKind};
use crate::utils::convergence::SolveStats;

/// Common interface for solvers of a global problem of kind `K`.
pub trait NonsmoothSolver<K: ProblemKind> {
    /// Solve `global`, starting from and writing into `reaction`.
    fn solve(&mut self, global: &GlobalProblem<K>, reaction: &mut [f64]) -> Result<SolveStats, NsError>;
}

pub mod lcp_qp;
pub use lcp_qp::{lcp_qp_toolkit, ConvexQp, LcpQpSolver, QpSolution, QpSolver};

pub mod nsgs;
pub use nsgs::{NsgsSolver, SweepReport};
