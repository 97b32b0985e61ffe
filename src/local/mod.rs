//! Local problems: allocation, release and per-contact extraction.

pub mod extraction;
pub mod problem;

pub use extraction::{
    compute_local_q, compute_local_rhs, copy_local_coefficient, fill_local_matrix, update_local_problem,
    update_local_problem_affine,
};
pub use problem::{LocalMatrix, LocalProblem};
