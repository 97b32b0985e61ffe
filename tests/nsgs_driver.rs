//! Outer Gauss-Seidel / Jacobi sweeps on small problems with known answers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use approx::assert_abs_diff_eq;
use faer::Mat;
use nsgs::local::LocalProblem;
use nsgs::matrix::SparseBlockMatrix;
use nsgs::problem::{Lcp, LinearComplementarityProblem};
use nsgs::solver::{lcp_qp_toolkit, ConvexQp, NonsmoothSolver, NsgsSolver, QpSolution, QpSolver};
use nsgs::toolkit::{LocalSolveStatus, LocalSolverToolkit};
use nsgs::{NsError, SolverOptions, SweepMode, SweepOrder};

fn m_2x2() -> Mat<f64> {
    Mat::from_fn(2, 2, |i, j| if i == j { 2.0 } else { 1.0 })
}

/// Scalar projected solve `r = max(0, q / m)`.
fn scalar_toolkit() -> LocalSolverToolkit<Lcp> {
    LocalSolverToolkit::with_default_primitives().with_local_solver(|local, r, _opts| {
        let Some(m) = local.matrix() else {
            return LocalSolveStatus::InvalidInput;
        };
        let m = m[(0, 0)];
        if m <= 0.0 {
            return LocalSolveStatus::InvalidInput;
        }
        r[0] = (local.q()[0] / m).max(0.0);
        LocalSolveStatus::Converged
    })
}

fn one_sweep(mode: SweepMode) -> Vec<f64> {
    let g = LinearComplementarityProblem::new(m_2x2(), vec![1.0, 1.0], None).unwrap();
    let mut solver = NsgsSolver::new(scalar_toolkit(), SolverOptions::default().with_mode(mode));
    let mut local = LocalProblem::allocate(&g).unwrap();
    let mut r = vec![0.0; 2];
    let report = solver.sweep(&g, &mut local, &mut r).unwrap();
    assert_eq!(report.contacts_visited, 2);
    assert_eq!(report.failed_local_solves, 0);
    local.release(&g);
    r
}

#[test]
fn gauss_seidel_sees_updates_within_the_sweep() {
    let r = one_sweep(SweepMode::GaussSeidel);
    assert_abs_diff_eq!(r[0], 0.5, epsilon = 1e-15);
    assert_abs_diff_eq!(r[1], 0.25, epsilon = 1e-15);
}

#[test]
fn jacobi_reads_the_start_of_sweep_snapshot() {
    let r = one_sweep(SweepMode::Jacobi);
    assert_abs_diff_eq!(r[0], 0.5, epsilon = 1e-15);
    assert_abs_diff_eq!(r[1], 0.5, epsilon = 1e-15);
}

#[test]
fn jacobi_report_is_independent_of_sweep_order() {
    for order in [SweepOrder::FORWARD, SweepOrder::BACKWARD, SweepOrder::SYMMETRIC] {
        let g = LinearComplementarityProblem::new(m_2x2(), vec![1.0, 1.0], None).unwrap();
        let opts = SolverOptions::default().with_mode(SweepMode::Jacobi).with_sweep_order(order);
        let mut solver = NsgsSolver::new(scalar_toolkit(), opts);
        let mut local = LocalProblem::allocate(&g).unwrap();
        let mut r = vec![0.0; 2];
        let report = solver.sweep(&g, &mut local, &mut r).unwrap();
        assert_eq!(report.contacts_visited, 2, "{order:?}");
        assert_abs_diff_eq!(report.norm_squared, 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(report.error_squared, 0.5, epsilon = 1e-15);
        assert_eq!(r, vec![0.5, 0.5]);
        local.release(&g);
    }
}

#[test]
fn full_solve_converges_for_every_mode_and_order() {
    for mode in [SweepMode::GaussSeidel, SweepMode::Jacobi] {
        for order in [SweepOrder::FORWARD, SweepOrder::BACKWARD, SweepOrder::SYMMETRIC] {
            let g = LinearComplementarityProblem::new(m_2x2(), vec![1.0, 1.0], None).unwrap();
            let opts = SolverOptions::new(1e-12, 500).with_mode(mode).with_sweep_order(order);
            let mut solver = NsgsSolver::new(scalar_toolkit(), opts);
            let mut r = vec![0.0; 2];
            let stats = solver.solve(&g, &mut r).unwrap();
            assert!(stats.converged, "{mode:?} {order:?}: {stats:?}");
            assert_abs_diff_eq!(r[0], 1.0 / 3.0, epsilon = 1e-9);
            assert_abs_diff_eq!(r[1], 1.0 / 3.0, epsilon = 1e-9);
        }
    }
}

#[test]
fn relaxed_solve_on_block_sparse_storage() {
    let sbm = SparseBlockMatrix::from_dense(m_2x2().as_ref(), 1).unwrap();
    let g = LinearComplementarityProblem::new(sbm, vec![1.0, 1.0], None).unwrap();
    let mut solver = NsgsSolver::new(scalar_toolkit(), SolverOptions::new(1e-12, 1000).with_relaxation(0.7));
    let mut r = vec![0.0; 2];
    let stats = solver.solve(&g, &mut r).unwrap();
    assert!(stats.converged);
    assert_abs_diff_eq!(r[0], 1.0 / 3.0, epsilon = 1e-9);
    assert_abs_diff_eq!(r[1], 1.0 / 3.0, epsilon = 1e-9);
}

/// Exact solver for one-variable QPs built from an LCP.
struct ScalarQp;

impl QpSolver for ScalarQp {
    fn solve(&self, qp: &ConvexQp, _tol: f64) -> Result<QpSolution, NsError> {
        if qp.n() != 1 {
            return Err(NsError::QpFailure(format!("expected one variable, got {}", qp.n())));
        }
        let (m, q) = (qp.a[(0, 0)], qp.b[0]);
        let x = (-q / m).max(0.0);
        let w = m * x + q;
        Ok(QpSolution { x: vec![x], multipliers: vec![0.0, w], info: 0 })
    }
}

#[test]
fn lcp_through_qp_local_solver() {
    let g = LinearComplementarityProblem::new(m_2x2(), vec![-1.0, -1.0], None).unwrap();
    let mut solver = NsgsSolver::new(lcp_qp_toolkit(ScalarQp), SolverOptions::new(1e-12, 500));
    let mut z = vec![0.0; 2];
    let stats = solver.solve(&g, &mut z).unwrap();
    assert!(stats.converged);
    assert_eq!(stats.failed_local_solves, 0);
    assert_abs_diff_eq!(z[0], 1.0 / 3.0, epsilon = 1e-9);
    assert_abs_diff_eq!(z[1], 1.0 / 3.0, epsilon = 1e-9);
}

#[test]
fn lcp_through_qp_first_sweep_uses_affine_rhs() {
    let g = LinearComplementarityProblem::new(m_2x2(), vec![-1.0, -1.0], None).unwrap();
    let mut solver = NsgsSolver::new(lcp_qp_toolkit(ScalarQp), SolverOptions::default());
    let mut local = LocalProblem::allocate(&g).unwrap();
    let mut z = vec![0.0; 2];
    solver.sweep(&g, &mut local, &mut z).unwrap();
    // z0 = 1/2, then q1 = -1 + 1/2 gives z1 = 1/4
    assert_abs_diff_eq!(z[0], 0.5, epsilon = 1e-15);
    assert_abs_diff_eq!(z[1], 0.25, epsilon = 1e-15);
}

#[test]
fn missing_local_solver_is_reported() {
    let g = LinearComplementarityProblem::new(m_2x2(), vec![1.0, 1.0], None).unwrap();
    let mut solver = NsgsSolver::new(LocalSolverToolkit::with_default_primitives(), SolverOptions::default());
    let mut r = vec![0.0; 2];
    assert_eq!(solver.solve(&g, &mut r), Err(NsError::MissingCapability("local_solver")));
}

#[test]
fn invalid_options_and_sizes_are_rejected() {
    let g = LinearComplementarityProblem::new(m_2x2(), vec![1.0, 1.0], None).unwrap();
    let mut solver = NsgsSolver::new(scalar_toolkit(), SolverOptions::default().with_relaxation(2.0));
    let mut r = vec![0.0; 2];
    assert!(matches!(solver.solve(&g, &mut r), Err(NsError::InvalidOption(_))));

    solver.options = SolverOptions::default();
    let mut short = vec![0.0; 1];
    assert_eq!(solver.solve(&g, &mut short), Err(NsError::DimensionMismatch { expected: 2, found: 1 }));
}

#[test]
fn failed_local_solves_are_counted_not_fatal() {
    let g = LinearComplementarityProblem::new(m_2x2(), vec![1.0, 1.0], None).unwrap();
    let tk = LocalSolverToolkit::with_default_primitives().with_local_solver(|local, r, _opts| {
        if let Some(m) = local.matrix() {
            r[0] = local.q()[0] / m[(0, 0)];
        }
        LocalSolveStatus::NotConverged
    });
    let mut solver = NsgsSolver::new(tk, SolverOptions::new(0.0, 3));
    let mut r = vec![0.0; 2];
    let stats = solver.solve(&g, &mut r).unwrap();
    assert_eq!(stats.iterations, 3);
    assert_eq!(stats.failed_local_solves, 6);
    assert!(!stats.converged);
}

#[test]
fn post_process_and_free_hooks_are_invoked() {
    let post_calls = Arc::new(AtomicUsize::new(0));
    let free_calls = Arc::new(AtomicUsize::new(0));
    let (post, free) = (Arc::clone(&post_calls), Arc::clone(&free_calls));
    let tk = scalar_toolkit()
        .with_post_processed_local_result(move |_, r| {
            post.fetch_add(1, Ordering::Relaxed);
            r[0] = r[0].min(0.3);
        })
        .with_free_local_solver(move |_, _, _| {
            free.fetch_add(1, Ordering::Relaxed);
        });
    let g = LinearComplementarityProblem::new(m_2x2(), vec![1.0, 1.0], None).unwrap();
    let mut solver = NsgsSolver::new(tk, SolverOptions::new(1e-12, 4));
    let mut r = vec![0.0; 2];
    let stats = solver.solve(&g, &mut r).unwrap();
    assert_eq!(post_calls.load(Ordering::Relaxed), 2 * stats.iterations);
    assert_eq!(free_calls.load(Ordering::Relaxed), 1);
    assert!(r.iter().all(|&x| x <= 0.3));
}

#[test]
fn free_hook_runs_when_a_sweep_fails() {
    // contact 1 has no stored diagonal block
    let scalar = |v: f64| Mat::from_fn(1, 1, |_, _| v);
    let sbm = SparseBlockMatrix::from_blocks(1, 2, vec![(0, 0, scalar(2.0)), (0, 1, scalar(1.0)), (1, 0, scalar(1.0))])
        .unwrap();
    let g = LinearComplementarityProblem::new(sbm, vec![1.0, 1.0], None).unwrap();

    let free_calls = Arc::new(AtomicUsize::new(0));
    let free = Arc::clone(&free_calls);
    let tk = LocalSolverToolkit::with_default_primitives()
        .with_local_solver(|local, r, opts| {
            let Some(m) = local.matrix() else {
                return LocalSolveStatus::InvalidInput;
            };
            r[0] = (local.q()[0] / m[(0, 0)]).max(0.0);
            // flavor scratch attached to the options
            opts.work.push(r[0]);
            LocalSolveStatus::Converged
        })
        .with_free_local_solver(move |_, _, opts| {
            free.fetch_add(1, Ordering::Relaxed);
            opts.work.clear();
        });
    let mut solver = NsgsSolver::new(tk, SolverOptions::default());
    solver.options.work = vec![1.0; 8];
    let mut r = vec![0.0; 2];

    assert_eq!(solver.solve(&g, &mut r), Err(NsError::MissingDiagonalBlock(1)));
    assert_eq!(free_calls.load(Ordering::Relaxed), 1);
    assert!(solver.options.work.is_empty());
    // contact 0 was solved before the failure
    assert_abs_diff_eq!(r[0], 0.5, epsilon = 1e-15);
}

#[test]
fn complementarity_holds_at_the_qp_solution() {
    let q = vec![-1.0, 0.5];
    let g = LinearComplementarityProblem::new(m_2x2(), q.clone(), None).unwrap();
    let mut solver = NsgsSolver::new(lcp_qp_toolkit(ScalarQp), SolverOptions::new(1e-12, 500));
    let mut z = vec![0.0; 2];
    assert!(solver.solve(&g, &mut z).unwrap().converged);

    let mut w = vec![0.0; 2];
    g.apply(&z, &mut w).unwrap();
    for k in 0..2 {
        w[k] += q[k];
        assert!(z[k] >= 0.0);
        assert!(w[k] >= -1e-9);
        assert_abs_diff_eq!(z[k] * w[k], 0.0, epsilon = 1e-9);
    }
    // z = [1/2, 0], w = [0, 1]
    assert_abs_diff_eq!(z[0], 0.5, epsilon = 1e-9);
    assert_abs_diff_eq!(w[1], 1.0, epsilon = 1e-9);
}
