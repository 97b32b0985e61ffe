//! Block extraction: build contact `c`'s local problem from the global one.
//!
//! Two right-hand side conventions are provided. [`compute_local_rhs`] is the
//! block Gauss-Seidel splitting of `M r = b`,
//!
//! ```text
//! b_c - Σ_{j ≠ c} M[c, j] r_j
//! ```
//!
//! and [`compute_local_q`] is the affine form used by complementarity
//! problems written as `w = M r + q`,
//!
//! ```text
//! q_c + Σ_{j ≠ c} M[c, j] r_j
//! ```
//!
//! Both read the reaction vector they are given as-is; handing in the live
//! vector gives Gauss-Seidel, handing in a start-of-sweep snapshot gives
//! Jacobi.

use tracing::trace;

use crate::config::SolverOptions;
use crate::error::NsError;
use crate::local::problem::{try_zeroed_block, LocalMatrix, LocalProblem};
use crate::matrix::{NumericsMatrix, StorageType};
use crate::problem::{GlobalProblem, ProblemKind};

/// Point or copy the diagonal block of contact `c` into `local`.
///
/// Block-sparse storage is aliased; dense and CSR storage are copied into
/// the local problem's owned buffer.
pub fn fill_local_matrix<'a, K: ProblemKind>(
    global: &'a GlobalProblem<K>,
    local: &mut LocalProblem<'a, K>,
    c: usize,
) -> Result<(), NsError> {
    global.check_contact(c)?;
    match global.matrix() {
        NumericsMatrix::SparseBlock(sbm) => {
            if sbm.block_size() != K::DIM {
                return Err(NsError::DimensionMismatch { expected: K::DIM, found: sbm.block_size() });
            }
            let block = sbm.diagonal_block(c).ok_or(NsError::MissingDiagonalBlock(c))?;
            local.matrix = LocalMatrix::Borrowed(block);
        }
        m @ (NumericsMatrix::Dense(_) | NumericsMatrix::Sparse(_)) => {
            if !local.matrix.is_owned() {
                local.matrix = LocalMatrix::Owned(try_zeroed_block(K::DIM)?);
            }
            if let LocalMatrix::Owned(buf) = &mut local.matrix {
                m.extract_diag_block(c, K::DIM, buf)?;
            }
        }
        NumericsMatrix::Operator(_) => {
            return Err(NsError::UnsupportedStorageFormat(StorageType::Operator));
        }
    }
    trace!(contact = c, borrowed = local.matrix.is_borrowed(), "filled local matrix");
    Ok(())
}

fn copy_rhs_slice<K: ProblemKind>(
    global: &GlobalProblem<K>,
    local: &mut LocalProblem<'_, K>,
    reaction: &[f64],
    c: usize,
) -> Result<(), NsError> {
    global.check_contact(c)?;
    if reaction.len() != global.size() {
        return Err(NsError::DimensionMismatch { expected: global.size(), found: reaction.len() });
    }
    let dim = K::DIM;
    local.q.copy_from_slice(&global.rhs()[c * dim..(c + 1) * dim]);
    Ok(())
}

/// `local.q = b_c - Σ_{j ≠ c} M[c, j] r_j`.
pub fn compute_local_rhs<K: ProblemKind>(
    global: &GlobalProblem<K>,
    local: &mut LocalProblem<'_, K>,
    reaction: &[f64],
    c: usize,
) -> Result<(), NsError> {
    copy_rhs_slice(global, local, reaction, c)?;
    global
        .matrix()
        .row_prod_no_diag(c, K::DIM, reaction, &mut local.scratch, false)?;
    for (qk, sk) in local.q.iter_mut().zip(&local.scratch) {
        *qk -= sk;
    }
    Ok(())
}

/// `local.q = q_c + Σ_{j ≠ c} M[c, j] r_j`.
pub fn compute_local_q<K: ProblemKind>(
    global: &GlobalProblem<K>,
    local: &mut LocalProblem<'_, K>,
    reaction: &[f64],
    c: usize,
) -> Result<(), NsError> {
    copy_rhs_slice(global, local, reaction, c)?;
    global
        .matrix()
        .row_prod_no_diag(c, K::DIM, reaction, &mut local.q, true)
}

/// Copy contact `c`'s coefficient when the problem has coefficients.
pub fn copy_local_coefficient<K: ProblemKind>(
    global: &GlobalProblem<K>,
    local: &mut LocalProblem<'_, K>,
    c: usize,
) -> Result<(), NsError> {
    global.check_contact(c)?;
    if let Some(coefs) = global.coefficients() {
        local.coefficient[0] = coefs[c];
    }
    Ok(())
}

/// Standard update: matrix block, `b - M r` right-hand side and coefficient.
pub fn update_local_problem<'a, K: ProblemKind>(
    c: usize,
    global: &'a GlobalProblem<K>,
    local: &mut LocalProblem<'a, K>,
    reaction: &[f64],
    _options: &SolverOptions,
) -> Result<(), NsError> {
    fill_local_matrix(global, local, c)?;
    compute_local_rhs(global, local, reaction, c)?;
    copy_local_coefficient(global, local, c)
}

/// Update for `w = M r + q` problems: matrix block, `q + M r` and coefficient.
pub fn update_local_problem_affine<'a, K: ProblemKind>(
    c: usize,
    global: &'a GlobalProblem<K>,
    local: &mut LocalProblem<'a, K>,
    reaction: &[f64],
    _options: &SolverOptions,
) -> Result<(), NsError> {
    fill_local_matrix(global, local, c)?;
    compute_local_q(global, local, reaction, c)?;
    copy_local_coefficient(global, local, c)
}
