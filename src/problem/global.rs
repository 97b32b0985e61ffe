//! The global problem container.
//!
//! A `GlobalProblem<K>` couples `number_of_contacts` contacts of dimension
//! `K::DIM` through one square `NumericsMatrix`. It is built once by the
//! caller and only read by extraction, except through the explicit
//! `matrix_mut` accessor, which the borrow checker forbids while any local
//! problem still borrows a diagonal block.

use std::marker::PhantomData;

use crate::core::traits::MatVec;
use crate::error::NsError;
use crate::matrix::NumericsMatrix;
use crate::problem::kinds::{FrictionContact3D, Lcp, MohrCoulomb2D, ProblemKind};

#[derive(Debug)]
pub struct GlobalProblem<K: ProblemKind> {
    matrix: NumericsMatrix,
    rhs: Vec<f64>,
    coefficients: Option<Vec<f64>>,
    number_of_contacts: usize,
    _kind: PhantomData<K>,
}

pub type FrictionContactProblem = GlobalProblem<FrictionContact3D>;
pub type MohrCoulomb2DProblem = GlobalProblem<MohrCoulomb2D>;
pub type LinearComplementarityProblem = GlobalProblem<Lcp>;

impl<K: ProblemKind> GlobalProblem<K> {
    /// Build and validate a problem.
    ///
    /// `rhs` must hold a positive multiple of `K::DIM` entries, the matrix must
    /// be square of that size and block-sparse storage must use `K::DIM`
    /// blocks. `coefficients`, when given, must hold one value per contact and
    /// are only accepted by kinds that have them.
    pub fn new(
        matrix: impl Into<NumericsMatrix>,
        rhs: Vec<f64>,
        coefficients: Option<Vec<f64>>,
    ) -> Result<Self, NsError> {
        let matrix = matrix.into();
        let n = rhs.len();
        if n == 0 || n % K::DIM != 0 {
            return Err(NsError::DimensionMismatch { expected: K::DIM * n.div_ceil(K::DIM).max(1), found: n });
        }
        if matrix.nrows() != n || matrix.ncols() != n {
            return Err(NsError::DimensionMismatch {
                expected: n,
                found: if matrix.nrows() != n { matrix.nrows() } else { matrix.ncols() },
            });
        }
        if let NumericsMatrix::SparseBlock(sbm) = &matrix {
            if sbm.block_size() != K::DIM {
                return Err(NsError::DimensionMismatch { expected: K::DIM, found: sbm.block_size() });
            }
        }
        let number_of_contacts = n / K::DIM;
        if coefficients.is_some() && !K::HAS_COEFFICIENT {
            return Err(NsError::UnexpectedCoefficients(K::NAME));
        }
        if let Some(coefs) = &coefficients {
            if coefs.len() != number_of_contacts {
                return Err(NsError::DimensionMismatch { expected: number_of_contacts, found: coefs.len() });
            }
        }
        Ok(Self { matrix, rhs, coefficients, number_of_contacts, _kind: PhantomData })
    }

    pub fn matrix(&self) -> &NumericsMatrix { &self.matrix }

    /// Mutable access to the interaction matrix.
    pub fn matrix_mut(&mut self) -> &mut NumericsMatrix { &mut self.matrix }

    pub fn rhs(&self) -> &[f64] { &self.rhs }
    pub fn coefficients(&self) -> Option<&[f64]> { self.coefficients.as_deref() }
    pub fn number_of_contacts(&self) -> usize { self.number_of_contacts }
    pub fn dimension(&self) -> usize { K::DIM }

    /// Total number of unknowns, `number_of_contacts * DIM`.
    pub fn size(&self) -> usize { self.rhs.len() }

    /// `out = M r`, for any storage including matrix-free operators.
    ///
    /// With the affine convention this gives `w = M r + q` once `q` is added
    /// back, which is how complementarity residuals are checked.
    pub fn apply(&self, reaction: &[f64], out: &mut [f64]) -> Result<(), NsError> {
        let n = self.size();
        if reaction.len() != n {
            return Err(NsError::DimensionMismatch { expected: n, found: reaction.len() });
        }
        if out.len() != n {
            return Err(NsError::DimensionMismatch { expected: n, found: out.len() });
        }
        self.matrix.matvec(reaction, out);
        Ok(())
    }

    pub(crate) fn check_contact(&self, contact: usize) -> Result<(), NsError> {
        if contact >= self.number_of_contacts {
            return Err(NsError::ContactOutOfRange { contact, contacts: self.number_of_contacts });
        }
        Ok(())
    }
}
