//! Matrix module: the global interaction matrix and its storage layouts.
//!
//! `NumericsMatrix` is what a global problem carries. Block extraction only
//! understands the three assembled layouts (dense, block-sparse, CSR); a
//! matrix-free `Operator` can still be multiplied but has no addressable
//! diagonal blocks, so extraction reports it as an unsupported format.

pub mod block;
pub mod dense;
pub mod sparse;

pub use block::SparseBlockMatrix;
pub use dense::DenseMatrix;
pub use sparse::{CsrMatrix, SparseMatrix};

use std::fmt;

use faer::Mat;

use crate::core::traits::{Indexing, MatVec};
use crate::error::NsError;

/// Storage tag of a [`NumericsMatrix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    Dense,
    SparseBlock,
    Sparse,
    Operator,
}

/// A matrix-free linear operator.
pub trait LinearOperator: MatVec<[f64]> + Indexing + Send + Sync {}

impl<T: MatVec<[f64]> + Indexing + Send + Sync> LinearOperator for T {}

/// Square interaction matrix in one of the supported layouts.
pub enum NumericsMatrix {
    Dense(Mat<f64>),
    SparseBlock(SparseBlockMatrix),
    Sparse(CsrMatrix),
    Operator(Box<dyn LinearOperator>),
}

impl NumericsMatrix {
    pub fn storage_type(&self) -> StorageType {
        match self {
            NumericsMatrix::Dense(_) => StorageType::Dense,
            NumericsMatrix::SparseBlock(_) => StorageType::SparseBlock,
            NumericsMatrix::Sparse(_) => StorageType::Sparse,
            NumericsMatrix::Operator(_) => StorageType::Operator,
        }
    }

    pub fn nrows(&self) -> usize {
        match self {
            NumericsMatrix::Dense(m) => m.nrows(),
            NumericsMatrix::SparseBlock(m) => Indexing::nrows(m),
            NumericsMatrix::Sparse(m) => SparseMatrix::nrows(m),
            NumericsMatrix::Operator(op) => op.nrows(),
        }
    }

    pub fn ncols(&self) -> usize {
        match self {
            NumericsMatrix::Dense(m) => m.ncols(),
            NumericsMatrix::SparseBlock(m) => Indexing::ncols(m),
            NumericsMatrix::Sparse(m) => SparseMatrix::ncols(m),
            NumericsMatrix::Operator(op) => op.ncols(),
        }
    }

    fn check_block_row(&self, c: usize, dim: usize) -> Result<(), NsError> {
        let contacts = if dim == 0 { 0 } else { self.nrows() / dim };
        if c >= contacts {
            return Err(NsError::ContactOutOfRange { contact: c, contacts });
        }
        Ok(())
    }

    /// Copy the `dim × dim` diagonal block of block row `c` into `out`.
    ///
    /// Block-sparse storage is copied too; callers wanting a view go through
    /// [`SparseBlockMatrix::diagonal_block`].
    pub fn extract_diag_block(&self, c: usize, dim: usize, out: &mut Mat<f64>) -> Result<(), NsError> {
        if out.nrows() != dim || out.ncols() != dim {
            return Err(NsError::DimensionMismatch { expected: dim, found: out.nrows() });
        }
        self.check_block_row(c, dim)?;
        match self {
            NumericsMatrix::Dense(m) => {
                dense::extract_diag_block(m.as_ref(), c, dim, out);
                Ok(())
            }
            NumericsMatrix::Sparse(m) => {
                m.extract_diag_block(c, dim, out);
                Ok(())
            }
            NumericsMatrix::SparseBlock(m) => {
                let block = m.diagonal_block(c).ok_or(NsError::MissingDiagonalBlock(c))?;
                for j in 0..dim {
                    for i in 0..dim {
                        out[(i, j)] = block[(i, j)];
                    }
                }
                Ok(())
            }
            NumericsMatrix::Operator(_) => Err(NsError::UnsupportedStorageFormat(StorageType::Operator)),
        }
    }

    /// y (+)= Σ_{j ≠ c} M[c, j] x_j, with `y` of length `dim`.
    pub fn row_prod_no_diag(
        &self,
        c: usize,
        dim: usize,
        x: &[f64],
        y: &mut [f64],
        accumulate: bool,
    ) -> Result<(), NsError> {
        if y.len() != dim {
            return Err(NsError::DimensionMismatch { expected: dim, found: y.len() });
        }
        if x.len() != self.ncols() {
            return Err(NsError::DimensionMismatch { expected: self.ncols(), found: x.len() });
        }
        self.check_block_row(c, dim)?;
        match self {
            NumericsMatrix::Dense(m) => dense::row_prod_no_diag(m.as_ref(), c, dim, x, y, accumulate),
            NumericsMatrix::Sparse(m) => m.row_prod_no_diag(c, dim, x, y, accumulate),
            NumericsMatrix::SparseBlock(m) => {
                if m.block_size() != dim {
                    return Err(NsError::DimensionMismatch { expected: dim, found: m.block_size() });
                }
                m.row_prod_no_diag(c, x, y, accumulate)
            }
            NumericsMatrix::Operator(_) => {
                return Err(NsError::UnsupportedStorageFormat(StorageType::Operator));
            }
        }
        Ok(())
    }
}

impl MatVec<[f64]> for NumericsMatrix {
    fn matvec(&self, x: &[f64], y: &mut [f64]) {
        match self {
            NumericsMatrix::Dense(m) => m.matvec(x, y),
            NumericsMatrix::SparseBlock(m) => m.matvec(x, y),
            NumericsMatrix::Sparse(m) => m.matvec(x, y),
            NumericsMatrix::Operator(op) => op.matvec(x, y),
        }
    }
}

impl fmt::Debug for NumericsMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NumericsMatrix::{:?}({}x{})", self.storage_type(), self.nrows(), self.ncols())
    }
}

impl From<Mat<f64>> for NumericsMatrix {
    fn from(m: Mat<f64>) -> Self {
        NumericsMatrix::Dense(m)
    }
}

impl From<SparseBlockMatrix> for NumericsMatrix {
    fn from(m: SparseBlockMatrix) -> Self {
        NumericsMatrix::SparseBlock(m)
    }
}

impl From<CsrMatrix> for NumericsMatrix {
    fn from(m: CsrMatrix) -> Self {
        NumericsMatrix::Sparse(m)
    }
}
