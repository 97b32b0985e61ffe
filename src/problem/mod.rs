//! Global problems: the coupled multi-contact systems a sweep works on.

pub mod global;
pub mod kinds;

pub use global::{FrictionContactProblem, GlobalProblem, LinearComplementarityProblem, MohrCoulomb2DProblem};
pub use kinds::{FrictionContact3D, Lcp, MohrCoulomb2D, ProblemKind};
