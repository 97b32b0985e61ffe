//! Options for the nonsmooth Gauss-Seidel driver and its local solvers.
//!
//! `SolverOptions` carries the outer stopping criteria, the relaxation factor
//! used by `perform_relaxation`, the tolerances handed down to local solvers,
//! and a scratch buffer that local-solver flavors may attach state to between
//! calls (released by their `free_local_solver` capability).

use bitflags::bitflags;

use crate::error::NsError;

bitflags! {
    /// Order in which contacts are visited during one sweep.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct SweepOrder: u32 {
        const FORWARD   = 0b0001;
        const BACKWARD  = 0b0010;
        const SYMMETRIC = Self::FORWARD.bits() | Self::BACKWARD.bits();
    }
}

/// How extraction reads the global reaction vector.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum SweepMode {
    /// Each contact sees the updates already applied earlier in the sweep.
    #[default]
    GaussSeidel,
    /// Each contact sees a snapshot taken at the start of the sweep.
    Jacobi,
}

/// Driver and local-solver parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    /// Outer tolerance on the normalized sweep error.
    pub tolerance: f64,

    /// Maximum number of outer sweeps.
    pub max_iterations: usize,

    /// Relaxation factor ω in (0, 1].
    pub relaxation: f64,

    /// Tolerance forwarded to local solvers.
    pub local_tolerance: f64,

    pub sweep_order: SweepOrder,

    pub mode: SweepMode,

    /// Flavor-owned scratch space.
    pub work: Vec<f64>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 1000,
            relaxation: 1.0,
            local_tolerance: 1e-12,
            sweep_order: SweepOrder::FORWARD,
            mode: SweepMode::GaussSeidel,
            work: Vec::new(),
        }
    }
}

impl SolverOptions {
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self { tolerance, max_iterations, ..Self::default() }
    }
    pub fn with_relaxation(mut self, omega: f64) -> Self { self.relaxation = omega; self }
    pub fn with_local_tolerance(mut self, tol: f64) -> Self { self.local_tolerance = tol; self }
    pub fn with_sweep_order(mut self, order: SweepOrder) -> Self { self.sweep_order = order; self }
    pub fn with_mode(mut self, mode: SweepMode) -> Self { self.mode = mode; self }

    /// Check every parameter before a solve starts.
    pub fn validate(&self) -> Result<(), NsError> {
        if !(self.tolerance >= 0.0) {
            return Err(NsError::InvalidOption(format!("tolerance must be >= 0, got {}", self.tolerance)));
        }
        if self.max_iterations == 0 {
            return Err(NsError::InvalidOption("max_iterations must be positive".into()));
        }
        if !(self.relaxation > 0.0 && self.relaxation <= 1.0) {
            return Err(NsError::InvalidOption(format!(
                "relaxation must lie in (0, 1], got {}",
                self.relaxation
            )));
        }
        if self.sweep_order.is_empty() {
            return Err(NsError::InvalidOption("sweep_order must contain a direction".into()));
        }
        Ok(())
    }
}
