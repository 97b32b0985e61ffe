//! Single-contact local problems and their lifecycle.
//!
//! A local problem owns its right-hand side, its coefficient and a scratch
//! row, and holds its `dim × dim` matrix in one of three modes:
//!
//! - [`LocalMatrix::Owned`]: a private copy, used for dense and CSR global
//!   storage. Refilled in place for every contact.
//! - [`LocalMatrix::Borrowed`]: a view of a diagonal block stored inside a
//!   block-sparse global matrix. Nothing is copied and nothing is freed on
//!   release; the lifetime `'a` keeps the view from outliving the global
//!   matrix and forbids mutating it while the view is held.
//! - [`LocalMatrix::Unbound`]: block-sparse local problem before its first
//!   extraction.

use std::marker::PhantomData;

use faer::{Mat, MatRef};
use tracing::debug;

use crate::error::NsError;
use crate::matrix::{DenseMatrix, StorageType};
use crate::problem::{GlobalProblem, ProblemKind};

/// Ownership-tagged local matrix.
#[derive(Debug)]
pub enum LocalMatrix<'a> {
    Unbound,
    Owned(Mat<f64>),
    Borrowed(MatRef<'a, f64>),
}

impl<'a> LocalMatrix<'a> {
    pub fn as_ref(&self) -> Option<MatRef<'_, f64>> {
        match self {
            LocalMatrix::Unbound => None,
            LocalMatrix::Owned(m) => Some(m.as_ref()),
            LocalMatrix::Borrowed(m) => Some(*m),
        }
    }

    pub fn is_borrowed(&self) -> bool {
        matches!(self, LocalMatrix::Borrowed(_))
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, LocalMatrix::Owned(_))
    }
}

/// The subproblem of one contact of a `GlobalProblem<K>`.
#[derive(Debug)]
pub struct LocalProblem<'a, K: ProblemKind> {
    pub(crate) matrix: LocalMatrix<'a>,
    pub(crate) q: Vec<f64>,
    pub(crate) coefficient: Vec<f64>,
    pub(crate) scratch: Vec<f64>,
    pub(crate) storage: StorageType,
    _kind: PhantomData<K>,
}

/// Zero-filled buffer whose allocation failure is reported instead of aborting.
pub(crate) fn try_zeroed(len: usize) -> Result<Vec<f64>, NsError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| NsError::AllocationFailure { requested: len })?;
    v.resize(len, 0.0);
    Ok(v)
}

pub(crate) fn try_zeroed_block(dim: usize) -> Result<Mat<f64>, NsError> {
    let data = try_zeroed(dim * dim)?;
    Ok(<Mat<f64> as DenseMatrix>::from_raw(dim, dim, data))
}

impl<'a, K: ProblemKind> LocalProblem<'a, K> {
    /// Allocate a local problem matching `global`'s storage layout.
    ///
    /// Dense and CSR storage get an owned `DIM × DIM` buffer; block-sparse
    /// storage starts unbound and borrows blocks on extraction.
    pub fn allocate(global: &GlobalProblem<K>) -> Result<Self, NsError> {
        let storage = global.matrix().storage_type();
        let matrix = match storage {
            StorageType::Dense | StorageType::Sparse => LocalMatrix::Owned(try_zeroed_block(K::DIM)?),
            StorageType::SparseBlock => LocalMatrix::Unbound,
            StorageType::Operator => return Err(NsError::UnsupportedStorageFormat(storage)),
        };
        let local = Self {
            matrix,
            q: try_zeroed(K::DIM)?,
            coefficient: try_zeroed(1)?,
            scratch: try_zeroed(K::DIM)?,
            storage,
            _kind: PhantomData,
        };
        debug!(
            kind = K::NAME,
            dim = K::DIM,
            ?storage,
            aliasing = storage == StorageType::SparseBlock,
            "allocated local problem"
        );
        Ok(local)
    }

    /// Release the local problem.
    ///
    /// Owned buffers are dropped. A `Borrowed` block is a `MatRef` view, so
    /// dropping it leaves the global storage untouched; the ownership tag is
    /// what makes release safe, no detaching step is needed. Consuming `self`
    /// makes a second release impossible.
    pub fn release(self, global: &GlobalProblem<K>) {
        debug_assert_eq!(
            self.storage,
            global.matrix().storage_type(),
            "local problem released against a different global problem"
        );
        debug!(kind = K::NAME, borrowed = self.matrix.is_borrowed(), "released local problem");
    }

    /// Always one: a local problem is a single-contact view.
    pub fn number_of_contacts(&self) -> usize { 1 }
    pub fn dimension(&self) -> usize { K::DIM }
    pub fn storage_type(&self) -> StorageType { self.storage }

    pub fn local_matrix(&self) -> &LocalMatrix<'a> { &self.matrix }

    /// Current `DIM × DIM` block, `None` until a block-sparse problem is filled.
    pub fn matrix(&self) -> Option<MatRef<'_, f64>> {
        self.matrix.as_ref()
    }

    /// Mutable access to an owned block; `None` when the block is borrowed.
    pub fn matrix_mut(&mut self) -> Option<&mut Mat<f64>> {
        match &mut self.matrix {
            LocalMatrix::Owned(m) => Some(m),
            _ => None,
        }
    }

    pub fn q(&self) -> &[f64] { &self.q }
    pub fn q_mut(&mut self) -> &mut [f64] { &mut self.q }

    /// The contact's scalar coefficient (μ for friction, η for Mohr-Coulomb).
    ///
    /// Zero until copied from a problem that has coefficients.
    pub fn coefficient(&self) -> f64 { self.coefficient[0] }
    pub fn set_coefficient(&mut self, value: f64) { self.coefficient[0] = value; }
}
