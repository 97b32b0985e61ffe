//! Dense‐matrix helpers on top of Faer.
//!
//! Diagonal-block extraction and the off-diagonal row-block product for a
//! column-major `faer::Mat<f64>` interaction matrix.

use crate::core::traits::{Indexing, MatVec};
use faer::{Mat, MatRef};

/// Dense matrix construction from raw column-major storage.
pub trait DenseMatrix: MatVec<[f64]> + Indexing + Sized {
    /// Construct from raw column-major storage.
    fn from_raw(nrows: usize, ncols: usize, data: Vec<f64>) -> Self;
}

impl DenseMatrix for Mat<f64> {
    fn from_raw(nrows: usize, ncols: usize, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), nrows * ncols, "raw data has incorrect length");
        Mat::from_fn(nrows, ncols, |i, j| data[j * nrows + i])
    }
}

/// Copy the `dim × dim` diagonal block at block row `c` into `out`.
pub fn extract_diag_block(a: MatRef<'_, f64>, c: usize, dim: usize, out: &mut Mat<f64>) {
    let offset = c * dim;
    for j in 0..dim {
        for i in 0..dim {
            out[(i, j)] = a[(offset + i, offset + j)];
        }
    }
}

/// y (+)= Σ_{j ≠ c} A[c, j] x_j over the rows of block `c`.
pub fn row_prod_no_diag(
    a: MatRef<'_, f64>,
    c: usize,
    dim: usize,
    x: &[f64],
    y: &mut [f64],
    accumulate: bool,
) {
    assert_eq!(a.ncols(), x.len(), "Input vector x has incorrect length");
    let (lo, hi) = (c * dim, (c + 1) * dim);
    for (k, yk) in y.iter_mut().enumerate().take(dim) {
        let row = lo + k;
        let mut sum = 0.0;
        for col in (0..lo).chain(hi..a.ncols()) {
            sum += a[(row, col)] * x[col];
        }
        *yk = if accumulate { *yk + sum } else { sum };
    }
}
