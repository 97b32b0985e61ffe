//! Problem kinds fix the per-contact dimension and coefficient semantics.

use std::fmt;

/// Compile-time description of a family of contact problems.
pub trait ProblemKind: fmt::Debug + Copy + Send + Sync + 'static {
    /// Unknowns per contact.
    const DIM: usize;
    /// Human-readable name used in logs.
    const NAME: &'static str;
    /// Whether each contact carries a scalar coefficient.
    const HAS_COEFFICIENT: bool;
}

/// 3D Coulomb friction; the coefficient is the friction coefficient μ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrictionContact3D;

impl ProblemKind for FrictionContact3D {
    const DIM: usize = 3;
    const NAME: &'static str = "friction-contact-3d";
    const HAS_COEFFICIENT: bool = true;
}

/// 2D Mohr-Coulomb plasticity; the coefficient is the cone parameter η.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MohrCoulomb2D;

impl ProblemKind for MohrCoulomb2D {
    const DIM: usize = 2;
    const NAME: &'static str = "mohr-coulomb-2d";
    const HAS_COEFFICIENT: bool = true;
}

/// Linear complementarity, one scalar unknown per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lcp;

impl ProblemKind for Lcp {
    const DIM: usize = 1;
    const NAME: &'static str = "lcp";
    const HAS_COEFFICIENT: bool = false;
}
