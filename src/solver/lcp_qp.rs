//! LCP local solver through a dense convex QP.
//!
//! The complementarity problem `w = M z + q, 0 ≤ z ⟂ w ≥ 0` is the optimality
//! system of
//!
//! ```text
//! min  ½ zᵀ (M + Mᵀ) z + qᵀ z
//! s.t. M z + q ≥ 0,  0 ≤ z ≤ 1e300
//! ```
//!
//! whose optimal value is `zᵀ w = 0`. The QP itself is solved by whatever
//! implements [`QpSolver`]; `w` is read back from the multipliers of the
//! lower bounds.

use faer::{Mat, MatRef};
use tracing::{trace, warn};

use crate::config::SolverOptions;
use crate::error::NsError;
use crate::local::update_local_problem_affine;
use crate::problem::Lcp;
use crate::toolkit::{LocalSolveStatus, LocalSolverToolkit};

/// Upper bound used for "unbounded" variables.
pub const QP_INFINITY: f64 = 1e300;

/// Dense convex QP: minimize `½ xᵀ Q x + pᵀ x` subject to `A x + b ≥ 0`
/// (the first `me` rows as equalities) and `xl ≤ x ≤ xu`.
#[derive(Debug, Clone)]
pub struct ConvexQp {
    pub q: Mat<f64>,
    pub p: Vec<f64>,
    pub a: Mat<f64>,
    pub b: Vec<f64>,
    /// Number of equality rows at the top of `a`.
    pub me: usize,
    pub xl: Vec<f64>,
    pub xu: Vec<f64>,
}

impl ConvexQp {
    /// QP whose KKT system is the LCP `(M, q)`.
    pub fn from_lcp(m: MatRef<'_, f64>, q: &[f64]) -> Result<Self, NsError> {
        let n = q.len();
        if m.nrows() != n || m.ncols() != n {
            return Err(NsError::DimensionMismatch { expected: n, found: m.nrows() });
        }
        Ok(Self {
            q: Mat::from_fn(n, n, |i, j| m[(i, j)] + m[(j, i)]),
            p: q.to_vec(),
            a: m.to_owned(),
            b: q.to_vec(),
            me: 0,
            xl: vec![0.0; n],
            xu: vec![QP_INFINITY; n],
        })
    }

    /// Number of variables.
    pub fn n(&self) -> usize { self.p.len() }
    /// Number of general constraints.
    pub fn m(&self) -> usize { self.b.len() }
}

/// Result of a QP solve.
#[derive(Debug, Clone, PartialEq)]
pub struct QpSolution {
    pub x: Vec<f64>,
    /// `m` constraint multipliers followed by `n` lower-bound multipliers
    /// (and optionally `n` upper-bound ones).
    pub multipliers: Vec<f64>,
    /// 0 on success, solver-specific code otherwise.
    pub info: i32,
}

/// Dense convex QP capability.
pub trait QpSolver: Send + Sync {
    fn solve(&self, qp: &ConvexQp, tol: f64) -> Result<QpSolution, NsError>;
}

/// Solves LCPs by delegating to a [`QpSolver`].
#[derive(Debug, Clone)]
pub struct LcpQpSolver<S> {
    qp: S,
}

impl<S: QpSolver> LcpQpSolver<S> {
    pub fn new(qp: S) -> Self {
        Self { qp }
    }

    /// Solve the LCP `(m, q)`, writing `z` and `w`.
    ///
    /// Both are zeroed first; a nonzero QP info code is reported as
    /// `NotConverged`.
    pub fn solve(
        &self,
        m: MatRef<'_, f64>,
        q: &[f64],
        z: &mut [f64],
        w: &mut [f64],
        options: &SolverOptions,
    ) -> Result<LocalSolveStatus, NsError> {
        let n = q.len();
        if z.len() != n || w.len() != n {
            return Err(NsError::DimensionMismatch { expected: n, found: z.len().min(w.len()) });
        }
        z.fill(0.0);
        w.fill(0.0);

        let problem = ConvexQp::from_lcp(m, q)?;
        let sol = self.qp.solve(&problem, options.local_tolerance)?;
        let nm = problem.m();
        if sol.x.len() != n {
            return Err(NsError::QpFailure(format!("primal has {} entries, expected {n}", sol.x.len())));
        }
        if sol.multipliers.len() < nm + n {
            return Err(NsError::QpFailure(format!(
                "{} multipliers returned, expected at least {}",
                sol.multipliers.len(),
                nm + n
            )));
        }
        z.copy_from_slice(&sol.x);
        w.copy_from_slice(&sol.multipliers[nm..nm + n]);
        trace!(info = sol.info, "lcp qp solve");
        Ok(if sol.info == 0 { LocalSolveStatus::Converged } else { LocalSolveStatus::NotConverged })
    }
}

/// Toolkit solving each scalar LCP row through `qp`.
///
/// Extraction uses the `q + M z` convention of `w = M z + q`.
pub fn lcp_qp_toolkit<S: QpSolver + 'static>(qp: S) -> LocalSolverToolkit<Lcp> {
    let solver = LcpQpSolver::new(qp);
    LocalSolverToolkit::with_default_primitives()
        .with_update_local_problem(|c, global, local, reaction, options| {
            update_local_problem_affine(c, global, local, reaction, options)
        })
        .with_local_solver(move |local, z, options| {
            let Some(m) = local.matrix() else {
                return LocalSolveStatus::InvalidInput;
            };
            let mut w = [0.0; 1];
            match solver.solve(m, local.q(), z, &mut w, options) {
                Ok(status) => status,
                Err(err) => {
                    warn!(%err, "lcp qp local solve failed");
                    LocalSolveStatus::InvalidInput
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder;

    impl QpSolver for Recorder {
        fn solve(&self, qp: &ConvexQp, _tol: f64) -> Result<QpSolution, NsError> {
            let n = qp.n();
            Ok(QpSolution {
                x: (0..n).map(|i| i as f64).collect(),
                multipliers: (0..qp.m() + n).map(|k| 10.0 + k as f64).collect(),
                info: 0,
            })
        }
    }

    #[test]
    fn qp_data_from_lcp() {
        let m = Mat::from_fn(2, 2, |i, j| (1 + 2 * i + j) as f64);
        let qp = ConvexQp::from_lcp(m.as_ref(), &[-1.0, 2.0]).unwrap();
        assert_eq!(qp.q[(0, 1)], m[(0, 1)] + m[(1, 0)]);
        assert_eq!(qp.q[(1, 1)], 2.0 * m[(1, 1)]);
        assert_eq!(qp.a[(1, 0)], m[(1, 0)]);
        assert_eq!(qp.p, vec![-1.0, 2.0]);
        assert_eq!(qp.b, vec![-1.0, 2.0]);
        assert_eq!(qp.xl, vec![0.0, 0.0]);
        assert_eq!(qp.xu, vec![QP_INFINITY; 2]);
        assert_eq!(qp.me, 0);
    }

    #[test]
    fn w_comes_from_lower_bound_multipliers() {
        let m = Mat::<f64>::identity(2, 2);
        let solver = LcpQpSolver::new(Recorder);
        let mut z = [5.0; 2];
        let mut w = [5.0; 2];
        let status = solver.solve(m.as_ref(), &[0.0, 0.0], &mut z, &mut w, &SolverOptions::default()).unwrap();
        assert_eq!(status, LocalSolveStatus::Converged);
        assert_eq!(z, [0.0, 1.0]);
        // m = 2 constraint multipliers come first
        assert_eq!(w, [12.0, 13.0]);
    }

    #[test]
    fn rejects_mismatched_sizes() {
        let m = Mat::<f64>::identity(2, 2);
        let solver = LcpQpSolver::new(Recorder);
        let mut z = [0.0; 3];
        let mut w = [0.0; 2];
        assert!(solver.solve(m.as_ref(), &[0.0, 0.0], &mut z, &mut w, &SolverOptions::default()).is_err());
    }
}
