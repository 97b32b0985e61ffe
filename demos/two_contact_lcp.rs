use faer::Mat;
use nsgs::local::update_local_problem_affine;
use nsgs::problem::{Lcp, LinearComplementarityProblem};
use nsgs::solver::{NonsmoothSolver, NsgsSolver};
use nsgs::toolkit::{LocalSolveStatus, LocalSolverToolkit};
use nsgs::{SolverOptions, SweepMode};

/// Projected scalar solve of `w = m z + q`, extraction in the `q + M z` form.
fn scalar_lcp_toolkit() -> LocalSolverToolkit<Lcp> {
    LocalSolverToolkit::with_default_primitives()
        .with_update_local_problem(|c, g, local, z, opts| update_local_problem_affine(c, g, local, z, opts))
        .with_local_solver(|local, z, _opts| match local.matrix() {
            Some(m) if m[(0, 0)] > 0.0 => {
                z[0] = (-local.q()[0] / m[(0, 0)]).max(0.0);
                LocalSolveStatus::Converged
            }
            _ => LocalSolveStatus::InvalidInput,
        })
}

fn main() -> Result<(), nsgs::NsError> {
    // w = M z + q, 0 <= z ⟂ w >= 0
    let m = Mat::from_fn(2, 2, |i, j| if i == j { 2.0 } else { 1.0 });
    let q = vec![-1.0, -1.0];
    let problem = LinearComplementarityProblem::new(m, q.clone(), None)?;
    println!("{}", scalar_lcp_toolkit());

    for mode in [SweepMode::GaussSeidel, SweepMode::Jacobi] {
        let opts = SolverOptions::new(1e-10, 200).with_mode(mode);
        let mut solver = NsgsSolver::new(scalar_lcp_toolkit(), opts);
        let mut z = vec![0.0; 2];
        let stats = solver.solve(&problem, &mut z)?;
        let mut w = vec![0.0; 2];
        problem.apply(&z, &mut w)?;
        w.iter_mut().zip(&q).for_each(|(wi, qi)| *wi += qi);
        println!("{mode:?}: z = {z:?}, w = {w:?}, stats = {stats:?}");
    }
    Ok(())
}
