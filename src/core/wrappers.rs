//! Implementations of the core traits for `faer` matrices and `f64` slices.
//!
//! Dense `Mat<f64>`/`MatRef<f64>` get `MatVec` over slices so they can back a
//! global interaction matrix or a matrix-free operator. The inner product on
//! slices is what the driver uses to normalize the sweep error when no
//! `squared_norm` capability is bound; with the `rayon` feature it reduces in
//! parallel.

use crate::core::traits::{Indexing, InnerProduct, MatVec};
use faer::{Mat, MatRef};

impl MatVec<[f64]> for Mat<f64> {
    fn matvec(&self, x: &[f64], y: &mut [f64]) {
        self.as_ref().matvec(x, y)
    }
}

impl<'a> MatVec<[f64]> for MatRef<'a, f64> {
    fn matvec(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(self.nrows(), y.len(), "Output vector y has incorrect length");
        assert_eq!(self.ncols(), x.len(), "Input vector x has incorrect length");
        for i in 0..self.nrows() {
            let mut sum = 0.0;
            for j in 0..self.ncols() {
                sum += self[(i, j)] * x[j];
            }
            y[i] = sum;
        }
    }
}

/// Dot product over slices.
impl InnerProduct<[f64]> for () {
    type Scalar = f64;
    fn dot(&self, x: &[f64], y: &[f64]) -> f64 {
        assert_eq!(x.len(), y.len(), "Vectors must have the same length");
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            x.par_iter()
                .zip(y.par_iter())
                .map(|(xi, yi)| xi * yi)
                .sum()
        }
        #[cfg(not(feature = "rayon"))]
        {
            x.iter().zip(y.iter()).map(|(xi, yi)| xi * yi).sum()
        }
    }
}

impl Indexing for Mat<f64> {
    fn nrows(&self) -> usize {
        self.nrows()
    }
    fn ncols(&self) -> usize {
        self.ncols()
    }
}

impl Indexing for [f64] {
    fn nrows(&self) -> usize {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn dense_matvec() {
        let a = Mat::from_fn(2, 3, |i, j| (i * 3 + j) as f64);
        let x = [1.0, 0.0, -1.0];
        let mut y = [0.0; 2];
        a.matvec(&x, &mut y);
        assert_eq!(y, [-2.0, -2.0]);
    }

    #[test]
    fn dot_on_slices() {
        let x = [3.0, 4.0];
        let ip = ();
        assert_abs_diff_eq!(ip.dot(&x[..], &[1.0, 1.0][..]), 7.0, epsilon = 1e-15);
        assert_abs_diff_eq!(ip.dot(&x[..], &x[..]), 25.0, epsilon = 1e-15);
    }
}
