// General sparse storage (CSR) over faer's `SparseRowMat`.

use faer::sparse::{SparseRowMat, SymbolicSparseRowMat};
use faer::{Mat, MatRef};

use crate::core::traits::{Indexing, MatVec};
use crate::error::NsError;

/// A read‐only sparse matrix supporting y = A * x.
pub trait SparseMatrix {
    /// Number of rows.
    fn nrows(&self) -> usize;
    /// Number of columns.
    fn ncols(&self) -> usize;
    /// Compute y = A * x.  `x.len() == ncols()`, `y.len() == nrows()`.
    fn spmv(&self, x: &[f64], y: &mut [f64]);
}

#[derive(Debug, Clone)]
pub struct CsrMatrix {
    inner: SparseRowMat<usize, f64>,
}

impl CsrMatrix {
    /// Build a CSR from raw row‐ptr, col‐idx, and values.
    ///
    /// Column indices must be strictly increasing within each row.
    pub fn from_csr(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<f64>,
    ) -> Result<Self, NsError> {
        if row_ptr.len() != nrows + 1 {
            return Err(NsError::DimensionMismatch { expected: nrows + 1, found: row_ptr.len() });
        }
        if values.len() != col_idx.len() {
            return Err(NsError::DimensionMismatch { expected: col_idx.len(), found: values.len() });
        }
        if row_ptr[0] != 0 || row_ptr[nrows] != col_idx.len() {
            return Err(NsError::InvalidPattern("row_ptr must start at 0 and end at nnz".into()));
        }
        for i in 0..nrows {
            if row_ptr[i] > row_ptr[i + 1] {
                return Err(NsError::InvalidPattern(format!("row_ptr decreases at row {i}")));
            }
            let cols = &col_idx[row_ptr[i]..row_ptr[i + 1]];
            if cols.iter().any(|&c| c >= ncols) {
                return Err(NsError::InvalidPattern(format!("column index out of range in row {i}")));
            }
            if cols.windows(2).any(|w| w[0] >= w[1]) {
                return Err(NsError::InvalidPattern(format!("unsorted or duplicate columns in row {i}")));
            }
        }
        // second argument `None` means "no separate row_nnz"
        let symbolic = SymbolicSparseRowMat::new_checked(nrows, ncols, row_ptr, None, col_idx);
        let inner = SparseRowMat::new(symbolic, values);
        Ok(Self { inner })
    }

    /// Compress a dense matrix, dropping entries with `|a_ij| <= drop_tol`.
    pub fn from_dense(a: MatRef<'_, f64>, drop_tol: f64) -> Result<Self, NsError> {
        let mut row_ptr = vec![0; a.nrows() + 1];
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        for i in 0..a.nrows() {
            for j in 0..a.ncols() {
                let v = a[(i, j)];
                if v.abs() > drop_tol {
                    col_idx.push(j);
                    values.push(v);
                }
            }
            row_ptr[i + 1] = col_idx.len();
        }
        Self::from_csr(a.nrows(), a.ncols(), row_ptr, col_idx, values)
    }

    /// `(col_idx, values)` of row `i`.
    fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let a = self.inner.as_ref();
        let row_ptr = a.symbolic().row_ptr();
        let range = row_ptr[i]..row_ptr[i + 1];
        (&a.symbolic().col_idx()[range.clone()], &a.val()[range])
    }

    /// Copy the `dim × dim` diagonal block at block row `c` into `out`.
    pub fn extract_diag_block(&self, c: usize, dim: usize, out: &mut Mat<f64>) {
        let (lo, hi) = (c * dim, (c + 1) * dim);
        for j in 0..dim {
            for i in 0..dim {
                out[(i, j)] = 0.0;
            }
        }
        for i in 0..dim {
            let (cols, vals) = self.row(lo + i);
            for (&col, &v) in cols.iter().zip(vals) {
                if (lo..hi).contains(&col) {
                    out[(i, col - lo)] = v;
                }
            }
        }
    }

    /// y (+)= Σ_{j ≠ c} A[c, j] x_j over the rows of block `c`.
    pub fn row_prod_no_diag(&self, c: usize, dim: usize, x: &[f64], y: &mut [f64], accumulate: bool) {
        assert_eq!(x.len(), SparseMatrix::ncols(self), "Input vector x has incorrect length");
        let (lo, hi) = (c * dim, (c + 1) * dim);
        for (k, yk) in y.iter_mut().enumerate().take(dim) {
            let (cols, vals) = self.row(lo + k);
            let sum: f64 = cols
                .iter()
                .zip(vals)
                .filter(|(col, _)| !(lo..hi).contains(*col))
                .map(|(&col, &v)| v * x[col])
                .sum();
            *yk = if accumulate { *yk + sum } else { sum };
        }
    }

    pub fn to_dense(&self) -> Mat<f64> {
        self.inner.to_dense()
    }
}

impl SparseMatrix for CsrMatrix {
    fn nrows(&self) -> usize {
        self.inner.nrows()
    }
    fn ncols(&self) -> usize {
        self.inner.ncols()
    }
    fn spmv(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), SparseMatrix::ncols(self));
        assert_eq!(y.len(), SparseMatrix::nrows(self));
        for (i, yi) in y.iter_mut().enumerate() {
            let (cols, vals) = self.row(i);
            *yi = cols.iter().zip(vals).map(|(&j, &v)| v * x[j]).sum();
        }
    }
}

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(feature = "rayon")]
impl CsrMatrix {
    /// Parallel SpMV using Rayon
    pub fn spmv_parallel(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), SparseMatrix::ncols(self));
        assert_eq!(y.len(), SparseMatrix::nrows(self));
        y.par_iter_mut().enumerate().for_each(|(i, yi)| {
            let (cols, vals) = self.row(i);
            *yi = cols.iter().zip(vals).map(|(&j, &v)| v * x[j]).sum();
        });
    }
}

impl Indexing for CsrMatrix {
    fn nrows(&self) -> usize {
        SparseMatrix::nrows(self)
    }
    fn ncols(&self) -> usize {
        SparseMatrix::ncols(self)
    }
}

impl MatVec<[f64]> for CsrMatrix {
    fn matvec(&self, x: &[f64], y: &mut [f64]) {
        #[cfg(feature = "rayon")]
        self.spmv_parallel(x, y);
        #[cfg(not(feature = "rayon"))]
        self.spmv(x, y);
    }
}
