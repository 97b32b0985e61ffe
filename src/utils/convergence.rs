//! Convergence tracking & tolerance checks for the outer sweep.

/// Stopping criteria.
#[derive(Clone, Debug)]
pub struct Convergence {
    pub tol: f64,
    pub max_iters: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SolveStats {
    pub iterations: usize,
    /// Normalized error of the last sweep.
    pub final_error: f64,
    pub converged: bool,
    /// Local solves that reported anything but convergence, over all sweeps.
    pub failed_local_solves: usize,
}

impl Convergence {
    /// Returns (should_stop, stats) given the normalized `error` after sweep `i`.
    pub fn check(&self, error: f64, i: usize, failed_local_solves: usize) -> (bool, SolveStats) {
        let converged = error <= self.tol;
        (
            converged || i >= self.max_iters,
            SolveStats { iterations: i, final_error: error, converged, failed_local_solves },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_on_tolerance() {
        let c = Convergence { tol: 1e-6, max_iters: 10 };
        let (stop, stats) = c.check(1e-7, 3, 0);
        assert!(stop);
        assert!(stats.converged);
        assert_eq!(stats.iterations, 3);
    }

    #[test]
    fn stops_on_iteration_cap_without_converging() {
        let c = Convergence { tol: 1e-6, max_iters: 10 };
        let (stop, stats) = c.check(1.0, 10, 2);
        assert!(stop);
        assert!(!stats.converged);
        assert_eq!(stats.failed_local_solves, 2);
        assert!(!c.check(1.0, 9, 0).0);
    }
}
