//! Nonsmooth block Gauss-Seidel over contacts.
//!
//! Per contact and sweep: rebuild the local problem from the global reaction,
//! hand it to the toolkit's local solver, post-process, relax against the
//! previous estimate and write the result back. In Gauss-Seidel mode the
//! write-back happens before the next contact is extracted, so every contact
//! sees the updates of the contacts processed before it in the same sweep.
//! In Jacobi mode extraction reads a snapshot taken when the sweep starts;
//! with the `rayon` feature those contacts are then processed in parallel,
//! each worker owning its own local problem and options.

use tracing::{debug, warn};

use crate::config::{SolverOptions, SweepMode, SweepOrder};
use crate::core::traits::InnerProduct;
use crate::error::NsError;
use crate::local::{update_local_problem, LocalProblem};
use crate::problem::{GlobalProblem, ProblemKind};
use crate::solver::NonsmoothSolver;
use crate::toolkit::{LocalSolveStatus, LocalSolverToolkit};
use crate::utils::convergence::{Convergence, SolveStats};

/// Accumulated result of one sweep.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SweepReport {
    /// Σ light_error_squared over the visited contacts.
    pub error_squared: f64,
    /// Σ squared_norm of the new local reactions (0 when the slot is unbound).
    pub norm_squared: f64,
    pub failed_local_solves: usize,
    pub contacts_visited: usize,
}

impl SweepReport {
    fn absorb(&mut self, outcome: ContactOutcome) {
        self.error_squared += outcome.error_squared;
        self.norm_squared += outcome.norm_squared;
        self.contacts_visited += 1;
        if !outcome.status.is_converged() {
            self.failed_local_solves += 1;
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct ContactOutcome {
    error_squared: f64,
    norm_squared: f64,
    status: LocalSolveStatus,
}

/// Block Gauss-Seidel (or Jacobi) driver for one local-solver flavor.
pub struct NsgsSolver<K: ProblemKind> {
    pub toolkit: LocalSolverToolkit<K>,
    pub options: SolverOptions,
}

impl<K: ProblemKind> NsgsSolver<K> {
    pub fn new(toolkit: LocalSolverToolkit<K>, options: SolverOptions) -> Self {
        Self { toolkit, options }
    }

    /// One sweep over all contacts, updating `reaction` in place.
    ///
    /// `local` must have been allocated for `global`.
    pub fn sweep<'g>(
        &mut self,
        global: &'g GlobalProblem<K>,
        local: &mut LocalProblem<'g, K>,
        reaction: &mut [f64],
    ) -> Result<SweepReport, NsError> {
        if reaction.len() != global.size() {
            return Err(NsError::DimensionMismatch { expected: global.size(), found: reaction.len() });
        }
        match self.options.mode {
            SweepMode::GaussSeidel => gauss_seidel_sweep(&self.toolkit, &mut self.options, global, local, reaction),
            SweepMode::Jacobi => jacobi_sweep(&self.toolkit, &mut self.options, global, local, reaction),
        }
    }
}

impl<K: ProblemKind> NonsmoothSolver<K> for NsgsSolver<K> {
    fn solve(&mut self, global: &GlobalProblem<K>, reaction: &mut [f64]) -> Result<SolveStats, NsError> {
        self.options.validate()?;
        self.toolkit.require_local_solver()?;
        if reaction.len() != global.size() {
            return Err(NsError::DimensionMismatch { expected: global.size(), found: reaction.len() });
        }
        let mut local = LocalProblem::allocate(global)?;
        let outcome = self.run_sweeps(global, &mut local, reaction);

        // the free hook runs on every exit path, including a failed sweep
        if let Some(free) = self.toolkit.free_local_solver() {
            free(&mut local, global, &mut self.options);
        }
        local.release(global);
        let stats = outcome?;
        if !stats.converged {
            warn!(iterations = stats.iterations, error = stats.final_error, "nsgs reached the iteration limit");
        }
        Ok(stats)
    }
}

impl<K: ProblemKind> NsgsSolver<K> {
    fn run_sweeps<'g>(
        &mut self,
        global: &'g GlobalProblem<K>,
        local: &mut LocalProblem<'g, K>,
        reaction: &mut [f64],
    ) -> Result<SolveStats, NsError> {
        let conv = Convergence { tol: self.options.tolerance, max_iters: self.options.max_iterations };
        let mut failed = 0;
        let mut stats = SolveStats { iterations: 0, final_error: f64::INFINITY, converged: false, failed_local_solves: 0 };

        for iter in 1..=self.options.max_iterations {
            let report = self.sweep(global, local, &mut *reaction)?;
            failed += report.failed_local_solves;
            let norm_squared = if self.toolkit.squared_norm().is_some() {
                report.norm_squared
            } else {
                ().dot(&*reaction, &*reaction)
            };
            let error = if norm_squared > 0.0 {
                (report.error_squared / norm_squared).sqrt()
            } else {
                report.error_squared.sqrt()
            };
            debug!(iter, error, failed = report.failed_local_solves, kind = K::NAME, "nsgs sweep");
            let (stop, s) = conv.check(error, iter, failed);
            stats = s;
            if stop {
                break;
            }
        }
        Ok(stats)
    }
}

fn contact_order(n: usize, order: SweepOrder) -> Vec<usize> {
    let mut contacts = Vec::with_capacity(2 * n);
    if order.contains(SweepOrder::FORWARD) {
        contacts.extend(0..n);
    }
    if order.contains(SweepOrder::BACKWARD) {
        contacts.extend((0..n).rev());
    }
    contacts
}

fn update<'g, K: ProblemKind>(
    toolkit: &LocalSolverToolkit<K>,
    options: &SolverOptions,
    c: usize,
    global: &'g GlobalProblem<K>,
    local: &mut LocalProblem<'g, K>,
    reaction: &[f64],
) -> Result<(), NsError> {
    match toolkit.update_local_problem() {
        Some(f) => f(c, global, local, reaction, options),
        None => update_local_problem(c, global, local, reaction, options),
    }
}

fn copy_reaction<K: ProblemKind>(toolkit: &LocalSolverToolkit<K>, src: &[f64], dst: &mut [f64]) {
    match toolkit.copy_local_reaction() {
        Some(f) => f(src, dst),
        None => dst.copy_from_slice(src),
    }
}

/// Solve an already-updated local problem into `r_c`, the contact's slice of
/// the output reaction vector, which also supplies the warm start.
fn solve_contact<K: ProblemKind>(
    toolkit: &LocalSolverToolkit<K>,
    options: &mut SolverOptions,
    c: usize,
    local: &mut LocalProblem<'_, K>,
    r_c: &mut [f64],
    previous: &mut [f64],
    r_local: &mut [f64],
) -> Result<ContactOutcome, NsError> {
    let solver = toolkit.require_local_solver()?;
    copy_reaction(toolkit, r_c, previous);
    copy_reaction(toolkit, r_c, r_local);

    let status = solver(&mut *local, &mut *r_local, &mut *options);
    if !status.is_converged() {
        warn!(contact = c, ?status, "local solver did not converge");
    }
    if let Some(post) = toolkit.post_processed_local_result() {
        post(c, &mut *r_local);
    }
    if let Some(relax) = toolkit.perform_relaxation() {
        relax(&mut *r_local, &*previous, options.relaxation);
    }
    let error_squared = toolkit.light_error_squared().map_or(0.0, |f| f(&*r_local, &*previous));
    let norm_squared = toolkit.squared_norm().map_or(0.0, |f| f(&*r_local));
    copy_reaction(toolkit, r_local, r_c);
    Ok(ContactOutcome { error_squared, norm_squared, status })
}

fn gauss_seidel_sweep<'g, K: ProblemKind>(
    toolkit: &LocalSolverToolkit<K>,
    options: &mut SolverOptions,
    global: &'g GlobalProblem<K>,
    local: &mut LocalProblem<'g, K>,
    reaction: &mut [f64],
) -> Result<SweepReport, NsError> {
    let dim = K::DIM;
    let mut previous = vec![0.0; dim];
    let mut r_local = vec![0.0; dim];
    let mut report = SweepReport::default();
    for c in contact_order(global.number_of_contacts(), options.sweep_order) {
        update(toolkit, options, c, global, local, reaction)?;
        let r_c = &mut reaction[c * dim..(c + 1) * dim];
        let outcome = solve_contact(toolkit, options, c, local, r_c, &mut previous, &mut r_local)?;
        report.absorb(outcome);
    }
    Ok(report)
}

/// Serial Jacobi sweep. Every contact reads the same snapshot, so the sweep
/// order is irrelevant and each contact is visited once, as in the parallel
/// build.
#[cfg(not(feature = "rayon"))]
fn jacobi_sweep<'g, K: ProblemKind>(
    toolkit: &LocalSolverToolkit<K>,
    options: &mut SolverOptions,
    global: &'g GlobalProblem<K>,
    local: &mut LocalProblem<'g, K>,
    reaction: &mut [f64],
) -> Result<SweepReport, NsError> {
    let dim = K::DIM;
    let snapshot = reaction.to_vec();
    let mut previous = vec![0.0; dim];
    let mut r_local = vec![0.0; dim];
    let mut report = SweepReport::default();
    for c in 0..global.number_of_contacts() {
        update(toolkit, options, c, global, local, &snapshot)?;
        let r_c = &mut reaction[c * dim..(c + 1) * dim];
        let outcome = solve_contact(toolkit, options, c, local, r_c, &mut previous, &mut r_local)?;
        report.absorb(outcome);
    }
    Ok(report)
}

/// Parallel Jacobi sweep, one visit per contact.
#[cfg(feature = "rayon")]
fn jacobi_sweep<'g, K: ProblemKind>(
    toolkit: &LocalSolverToolkit<K>,
    options: &mut SolverOptions,
    global: &'g GlobalProblem<K>,
    _local: &mut LocalProblem<'g, K>,
    reaction: &mut [f64],
) -> Result<SweepReport, NsError> {
    use rayon::prelude::*;

    let dim = K::DIM;
    let snapshot = reaction.to_vec();
    let shared: &SolverOptions = options;
    let outcomes = reaction
        .par_chunks_mut(dim)
        .enumerate()
        .map_init(
            || (LocalProblem::allocate(global), shared.clone(), vec![0.0; dim], vec![0.0; dim]),
            |(local, opts, previous, r_local), (c, r_c)| {
                let local = local.as_mut().map_err(|e| e.clone())?;
                update(toolkit, opts, c, global, local, &snapshot)?;
                solve_contact(toolkit, opts, c, local, r_c, previous, r_local)
            },
        )
        .collect::<Result<Vec<_>, NsError>>()?;

    let mut report = SweepReport::default();
    for outcome in outcomes {
        report.absorb(outcome);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_orders() {
        assert_eq!(contact_order(3, SweepOrder::FORWARD), vec![0, 1, 2]);
        assert_eq!(contact_order(3, SweepOrder::BACKWARD), vec![2, 1, 0]);
        assert_eq!(contact_order(2, SweepOrder::SYMMETRIC), vec![0, 1, 1, 0]);
    }

    #[test]
    fn report_counts_failures() {
        let mut report = SweepReport::default();
        report.absorb(ContactOutcome { error_squared: 1.0, norm_squared: 2.0, status: LocalSolveStatus::Converged });
        report.absorb(ContactOutcome { error_squared: 0.5, norm_squared: 0.0, status: LocalSolveStatus::NotConverged });
        assert_eq!(report.contacts_visited, 2);
        assert_eq!(report.failed_local_solves, 1);
        assert_eq!(report.error_squared, 1.5);
        assert_eq!(report.norm_squared, 2.0);
    }
}
