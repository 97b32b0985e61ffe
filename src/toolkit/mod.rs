//! The local-solver function toolkit.
//!
//! A [`LocalSolverToolkit`] is the capability table one local-solver flavor
//! plugs into the outer sweep. Every slot is optional; callers look a slot up
//! and skip it when it is unbound. The toolkit is built once, before the
//! sweep, and never changes afterwards.
//!
//! # Example
//!
//! ```rust
//! use nsgs::toolkit::{LocalSolveStatus, LocalSolverToolkit, ToolkitSlots};
//! use nsgs::problem::Lcp;
//!
//! let toolkit = LocalSolverToolkit::<Lcp>::with_default_primitives()
//!     .with_local_solver(|local, r, _opts| {
//!         let m = local.matrix().map(|m| m[(0, 0)]).unwrap_or(0.0);
//!         if m <= 0.0 {
//!             return LocalSolveStatus::InvalidInput;
//!         }
//!         r[0] = (local.q()[0] / m).max(0.0);
//!         LocalSolveStatus::Converged
//!     });
//! assert!(toolkit.slots().contains(ToolkitSlots::LOCAL_SOLVER));
//! println!("{toolkit}");
//! ```

use std::fmt;

use bitflags::bitflags;

use crate::config::SolverOptions;
use crate::error::NsError;
use crate::local::{LocalProblem, update_local_problem};
use crate::problem::{GlobalProblem, ProblemKind};
use crate::utils::primitives;

/// Outcome reported by a local solver. Transported to the driver as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalSolveStatus {
    Converged,
    NotConverged,
    InvalidInput,
}

impl LocalSolveStatus {
    pub fn is_converged(self) -> bool {
        self == LocalSolveStatus::Converged
    }
}

bitflags! {
    /// Which toolkit slots are bound.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct ToolkitSlots: u32 {
        const LOCAL_SOLVER                = 0b0000_0001;
        const UPDATE_LOCAL_PROBLEM        = 0b0000_0010;
        const POST_PROCESSED_LOCAL_RESULT = 0b0000_0100;
        const FREE_LOCAL_SOLVER           = 0b0000_1000;
        const COPY_LOCAL_REACTION         = 0b0001_0000;
        const PERFORM_RELAXATION          = 0b0010_0000;
        const LIGHT_ERROR_SQUARED         = 0b0100_0000;
        const SQUARED_NORM                = 0b1000_0000;
    }
}

/// Solve one local problem in place: (local problem, local reaction, options).
pub type LocalSolverFn<K> =
    Box<dyn for<'l> Fn(&mut LocalProblem<'l, K>, &mut [f64], &mut SolverOptions) -> LocalSolveStatus + Send + Sync>;
/// Rebuild the local problem of a contact: (contact, global, local, global reaction, options).
pub type UpdateLocalProblemFn<K> = Box<
    dyn for<'g> Fn(usize, &'g GlobalProblem<K>, &mut LocalProblem<'g, K>, &[f64], &SolverOptions) -> Result<(), NsError>
        + Send
        + Sync,
>;
/// Post-process a solved local reaction: (contact, local reaction).
pub type PostProcessFn = Box<dyn Fn(usize, &mut [f64]) + Send + Sync>;
/// Release flavor scratch state: (local, global, options).
pub type FreeLocalSolverFn<K> =
    Box<dyn for<'l> Fn(&mut LocalProblem<'l, K>, &GlobalProblem<K>, &mut SolverOptions) + Send + Sync>;
/// (source, destination).
pub type CopyLocalReactionFn = Box<dyn Fn(&[f64], &mut [f64]) + Send + Sync>;
/// (reaction in/out, previous, ω).
pub type PerformRelaxationFn = Box<dyn Fn(&mut [f64], &[f64], f64) + Send + Sync>;
/// (candidate, reference) → squared error.
pub type LightErrorSquaredFn = Box<dyn Fn(&[f64], &[f64]) -> f64 + Send + Sync>;
/// vector → squared norm.
pub type SquaredNormFn = Box<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// Capability table of one local-solver flavor for problems of kind `K`.
pub struct LocalSolverToolkit<K: ProblemKind> {
    local_solver: Option<LocalSolverFn<K>>,
    update_local_problem: Option<UpdateLocalProblemFn<K>>,
    post_processed_local_result: Option<PostProcessFn>,
    free_local_solver: Option<FreeLocalSolverFn<K>>,
    copy_local_reaction: Option<CopyLocalReactionFn>,
    perform_relaxation: Option<PerformRelaxationFn>,
    light_error_squared: Option<LightErrorSquaredFn>,
    squared_norm: Option<SquaredNormFn>,
}

impl<K: ProblemKind> Default for LocalSolverToolkit<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ProblemKind> LocalSolverToolkit<K> {
    /// A toolkit with every slot unbound.
    pub fn new() -> Self {
        Self {
            local_solver: None,
            update_local_problem: None,
            post_processed_local_result: None,
            free_local_solver: None,
            copy_local_reaction: None,
            perform_relaxation: None,
            light_error_squared: None,
            squared_norm: None,
        }
    }

    /// Standard extraction and the plain vector primitives; no local solver.
    pub fn with_default_primitives() -> Self {
        Self::new()
            .with_update_local_problem(|c, global, local, reaction, options| {
                update_local_problem(c, global, local, reaction, options)
            })
            .with_copy_local_reaction(primitives::copy_local_reaction)
            .with_perform_relaxation(primitives::perform_relaxation)
            .with_light_error_squared(primitives::light_error_squared)
            .with_squared_norm(primitives::squared_norm)
    }

    pub fn with_local_solver<F>(mut self, f: F) -> Self
    where
        F: for<'l> Fn(&mut LocalProblem<'l, K>, &mut [f64], &mut SolverOptions) -> LocalSolveStatus
            + Send
            + Sync
            + 'static,
    {
        self.local_solver = Some(Box::new(f));
        self
    }

    pub fn with_update_local_problem<F>(mut self, f: F) -> Self
    where
        F: for<'g> Fn(usize, &'g GlobalProblem<K>, &mut LocalProblem<'g, K>, &[f64], &SolverOptions) -> Result<(), NsError>
            + Send
            + Sync
            + 'static,
    {
        self.update_local_problem = Some(Box::new(f));
        self
    }

    pub fn with_post_processed_local_result<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, &mut [f64]) + Send + Sync + 'static,
    {
        self.post_processed_local_result = Some(Box::new(f));
        self
    }

    pub fn with_free_local_solver<F>(mut self, f: F) -> Self
    where
        F: for<'l> Fn(&mut LocalProblem<'l, K>, &GlobalProblem<K>, &mut SolverOptions) + Send + Sync + 'static,
    {
        self.free_local_solver = Some(Box::new(f));
        self
    }

    pub fn with_copy_local_reaction<F>(mut self, f: F) -> Self
    where
        F: Fn(&[f64], &mut [f64]) + Send + Sync + 'static,
    {
        self.copy_local_reaction = Some(Box::new(f));
        self
    }

    pub fn with_perform_relaxation<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut [f64], &[f64], f64) + Send + Sync + 'static,
    {
        self.perform_relaxation = Some(Box::new(f));
        self
    }

    pub fn with_light_error_squared<F>(mut self, f: F) -> Self
    where
        F: Fn(&[f64], &[f64]) -> f64 + Send + Sync + 'static,
    {
        self.light_error_squared = Some(Box::new(f));
        self
    }

    pub fn with_squared_norm<F>(mut self, f: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        self.squared_norm = Some(Box::new(f));
        self
    }

    pub fn local_solver(&self) -> Option<&LocalSolverFn<K>> { self.local_solver.as_ref() }
    pub fn update_local_problem(&self) -> Option<&UpdateLocalProblemFn<K>> { self.update_local_problem.as_ref() }
    pub fn post_processed_local_result(&self) -> Option<&PostProcessFn> { self.post_processed_local_result.as_ref() }
    pub fn free_local_solver(&self) -> Option<&FreeLocalSolverFn<K>> { self.free_local_solver.as_ref() }
    pub fn copy_local_reaction(&self) -> Option<&CopyLocalReactionFn> { self.copy_local_reaction.as_ref() }
    pub fn perform_relaxation(&self) -> Option<&PerformRelaxationFn> { self.perform_relaxation.as_ref() }
    pub fn light_error_squared(&self) -> Option<&LightErrorSquaredFn> { self.light_error_squared.as_ref() }
    pub fn squared_norm(&self) -> Option<&SquaredNormFn> { self.squared_norm.as_ref() }

    /// The bound local solver, or `MissingCapability` when there is none.
    pub fn require_local_solver(&self) -> Result<&LocalSolverFn<K>, NsError> {
        self.local_solver.as_ref().ok_or(NsError::MissingCapability("local_solver"))
    }

    pub fn slots(&self) -> ToolkitSlots {
        let mut slots = ToolkitSlots::empty();
        slots.set(ToolkitSlots::LOCAL_SOLVER, self.local_solver.is_some());
        slots.set(ToolkitSlots::UPDATE_LOCAL_PROBLEM, self.update_local_problem.is_some());
        slots.set(ToolkitSlots::POST_PROCESSED_LOCAL_RESULT, self.post_processed_local_result.is_some());
        slots.set(ToolkitSlots::FREE_LOCAL_SOLVER, self.free_local_solver.is_some());
        slots.set(ToolkitSlots::COPY_LOCAL_REACTION, self.copy_local_reaction.is_some());
        slots.set(ToolkitSlots::PERFORM_RELAXATION, self.perform_relaxation.is_some());
        slots.set(ToolkitSlots::LIGHT_ERROR_SQUARED, self.light_error_squared.is_some());
        slots.set(ToolkitSlots::SQUARED_NORM, self.squared_norm.is_some());
        slots
    }

    /// A toolkit without a local solver cannot drive a sweep.
    pub fn is_usable(&self) -> bool {
        self.local_solver.is_some()
    }
}

const SLOT_NAMES: [(ToolkitSlots, &str); 8] = [
    (ToolkitSlots::LOCAL_SOLVER, "local_solver"),
    (ToolkitSlots::UPDATE_LOCAL_PROBLEM, "update_local_problem"),
    (ToolkitSlots::POST_PROCESSED_LOCAL_RESULT, "post_processed_local_result"),
    (ToolkitSlots::FREE_LOCAL_SOLVER, "free_local_solver"),
    (ToolkitSlots::COPY_LOCAL_REACTION, "copy_local_reaction"),
    (ToolkitSlots::PERFORM_RELAXATION, "perform_relaxation"),
    (ToolkitSlots::LIGHT_ERROR_SQUARED, "light_error_squared"),
    (ToolkitSlots::SQUARED_NORM, "squared_norm"),
];

/// One line per slot, `bound` or `unbound`.
impl<K: ProblemKind> fmt::Display for LocalSolverToolkit<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots();
        writeln!(f, "LocalSolverToolkit<{}>", K::NAME)?;
        for (flag, name) in SLOT_NAMES {
            let state = if slots.contains(flag) { "bound" } else { "unbound" };
            writeln!(f, "  {name:<28} {state}")?;
        }
        Ok(())
    }
}

impl<K: ProblemKind> fmt::Debug for LocalSolverToolkit<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSolverToolkit")
            .field("kind", &K::NAME)
            .field("slots", &self.slots())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{FrictionContact3D, MohrCoulomb2D};

    #[test]
    fn new_toolkit_has_no_slots() {
        let tk = LocalSolverToolkit::<FrictionContact3D>::new();
        assert!(tk.slots().is_empty());
        assert!(!tk.is_usable());
        assert!(matches!(tk.require_local_solver(), Err(NsError::MissingCapability("local_solver"))));
    }

    #[test]
    fn default_primitives_bind_everything_but_solver_hooks() {
        let tk = LocalSolverToolkit::<MohrCoulomb2D>::with_default_primitives();
        let expected = ToolkitSlots::UPDATE_LOCAL_PROBLEM
            | ToolkitSlots::COPY_LOCAL_REACTION
            | ToolkitSlots::PERFORM_RELAXATION
            | ToolkitSlots::LIGHT_ERROR_SQUARED
            | ToolkitSlots::SQUARED_NORM;
        assert_eq!(tk.slots(), expected);
        assert!(tk.post_processed_local_result().is_none());
        assert!(tk.free_local_solver().is_none());
    }

    #[test]
    fn bound_slots_are_callable() {
        let tk = LocalSolverToolkit::<MohrCoulomb2D>::new()
            .with_post_processed_local_result(|_, r| r.iter_mut().for_each(|x| *x = x.max(0.0)))
            .with_squared_norm(|v| v.iter().map(|x| x * x).sum());
        let mut r = [-1.0, 2.0];
        if let Some(post) = tk.post_processed_local_result() {
            post(0, &mut r);
        }
        assert_eq!(r, [0.0, 2.0]);
        assert_eq!(tk.squared_norm().map(|n| n(&r)), Some(4.0));
        assert!(tk.perform_relaxation().is_none());
    }

    #[test]
    fn display_reports_each_slot() {
        let tk = LocalSolverToolkit::<FrictionContact3D>::new()
            .with_local_solver(|_, _, _| LocalSolveStatus::Converged);
        let s = format!("{tk}");
        assert!(s.starts_with("LocalSolverToolkit<friction-contact-3d>"));
        assert_eq!(s.lines().count(), 9);
        assert!(s.lines().any(|l| l.contains("local_solver") && l.ends_with(" bound")));
        assert!(s.lines().any(|l| l.contains("squared_norm") && l.ends_with("unbound")));
    }
}
