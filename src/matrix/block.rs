//! Block-sparse storage: a block-row compressed pattern over dense blocks.
//!
//! Every stored block is a `block_size × block_size` `faer::Mat<f64>`. Block
//! rows are compressed the same way CSR compresses scalar rows (`row_ptr`
//! into `col_idx`/`blocks`), and the position of each diagonal block is
//! cached so a local problem can borrow it without a search.

use crate::core::traits::{Indexing, MatVec};
use crate::error::NsError;
use faer::{Mat, MatRef};

#[derive(Debug, Clone)]
pub struct SparseBlockMatrix {
    block_size: usize,
    n_block_rows: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    blocks: Vec<Mat<f64>>,
    diag_pos: Vec<Option<usize>>,
}

impl SparseBlockMatrix {
    /// Assemble from `(block_row, block_col, block)` entries in any order.
    ///
    /// Entries sharing a position are summed.
    pub fn from_blocks(
        block_size: usize,
        n_block_rows: usize,
        entries: Vec<(usize, usize, Mat<f64>)>,
    ) -> Result<Self, NsError> {
        if block_size == 0 {
            return Err(NsError::InvalidPattern("block size must be positive".into()));
        }
        let mut entries = entries;
        for (r, c, b) in &entries {
            if *r >= n_block_rows || *c >= n_block_rows {
                return Err(NsError::InvalidPattern(format!(
                    "block ({r}, {c}) outside a {n_block_rows}x{n_block_rows} block pattern"
                )));
            }
            if b.nrows() != block_size || b.ncols() != block_size {
                return Err(NsError::DimensionMismatch {
                    expected: block_size,
                    found: if b.nrows() != block_size { b.nrows() } else { b.ncols() },
                });
            }
        }
        entries.sort_by_key(|(r, c, _)| (*r, *c));

        let mut row_ptr = vec![0; n_block_rows + 1];
        let mut col_idx: Vec<usize> = Vec::with_capacity(entries.len());
        let mut blocks: Vec<Mat<f64>> = Vec::with_capacity(entries.len());
        let mut last: Option<(usize, usize)> = None;
        for (r, c, b) in entries {
            if last == Some((r, c)) {
                if let Some(prev) = blocks.last_mut() {
                    for j in 0..block_size {
                        for i in 0..block_size {
                            prev[(i, j)] += b[(i, j)];
                        }
                    }
                }
                continue;
            }
            row_ptr[r + 1] += 1;
            col_idx.push(c);
            blocks.push(b);
            last = Some((r, c));
        }
        for r in 0..n_block_rows {
            row_ptr[r + 1] += row_ptr[r];
        }

        let diag_pos = (0..n_block_rows)
            .map(|r| (row_ptr[r]..row_ptr[r + 1]).find(|&k| col_idx[k] == r))
            .collect();

        Ok(Self { block_size, n_block_rows, row_ptr, col_idx, blocks, diag_pos })
    }

    /// Split a dense square matrix into blocks, keeping every diagonal block
    /// and every off-diagonal block with a nonzero entry.
    pub fn from_dense(a: MatRef<'_, f64>, block_size: usize) -> Result<Self, NsError> {
        if block_size == 0 || a.nrows() % block_size != 0 || a.nrows() != a.ncols() {
            return Err(NsError::DimensionMismatch { expected: a.nrows(), found: a.ncols() });
        }
        let nb = a.nrows() / block_size;
        let mut entries = Vec::new();
        for r in 0..nb {
            for c in 0..nb {
                let b = Mat::from_fn(block_size, block_size, |i, j| {
                    a[(r * block_size + i, c * block_size + j)]
                });
                let nonzero = (0..block_size)
                    .any(|j| (0..block_size).any(|i| b[(i, j)] != 0.0));
                if r == c || nonzero {
                    entries.push((r, c, b));
                }
            }
        }
        Self::from_blocks(block_size, nb, entries)
    }

    pub fn block_size(&self) -> usize { self.block_size }
    pub fn nnz_blocks(&self) -> usize { self.blocks.len() }

    /// View of the stored diagonal block of block row `c`.
    pub fn diagonal_block(&self, c: usize) -> Option<MatRef<'_, f64>> {
        let pos = (*self.diag_pos.get(c)?)?;
        Some(self.blocks[pos].as_ref())
    }

    /// Mutable access to the stored diagonal block of block row `c`.
    pub fn diagonal_block_mut(&mut self, c: usize) -> Option<&mut Mat<f64>> {
        let pos = (*self.diag_pos.get(c)?)?;
        Some(&mut self.blocks[pos])
    }

    /// Stored blocks of block row `r` as `(block_col, block)`.
    pub fn block_row(&self, r: usize) -> impl Iterator<Item = (usize, MatRef<'_, f64>)> + '_ {
        (self.row_ptr[r]..self.row_ptr[r + 1]).map(move |k| (self.col_idx[k], self.blocks[k].as_ref()))
    }

    /// y (+)= Σ_{j ≠ r} B[r, j] x_j.
    pub fn row_prod_no_diag(&self, r: usize, x: &[f64], y: &mut [f64], accumulate: bool) {
        let bs = self.block_size;
        assert_eq!(x.len(), self.nrows(), "Input vector x has incorrect length");
        if !accumulate {
            y[..bs].fill(0.0);
        }
        for (c, b) in self.block_row(r).filter(|(c, _)| *c != r) {
            let xc = &x[c * bs..(c + 1) * bs];
            for i in 0..bs {
                let mut sum = 0.0;
                for j in 0..bs {
                    sum += b[(i, j)] * xc[j];
                }
                y[i] += sum;
            }
        }
    }

    pub fn to_dense(&self) -> Mat<f64> {
        let bs = self.block_size;
        let mut out = Mat::zeros(self.nrows(), self.nrows());
        for r in 0..self.n_block_rows {
            for (c, b) in self.block_row(r) {
                for j in 0..bs {
                    for i in 0..bs {
                        out[(r * bs + i, c * bs + j)] = b[(i, j)];
                    }
                }
            }
        }
        out
    }
}

impl Indexing for SparseBlockMatrix {
    fn nrows(&self) -> usize {
        self.n_block_rows * self.block_size
    }
    fn ncols(&self) -> usize {
        self.nrows()
    }
}

impl MatVec<[f64]> for SparseBlockMatrix {
    fn matvec(&self, x: &[f64], y: &mut [f64]) {
        let bs = self.block_size;
        assert_eq!(y.len(), self.nrows(), "Output vector y has incorrect length");
        for r in 0..self.n_block_rows {
            let yr = &mut y[r * bs..(r + 1) * bs];
            self.row_prod_no_diag(r, x, yr, false);
            if let Some(d) = self.diagonal_block(r) {
                let xr = &x[r * bs..(r + 1) * bs];
                for i in 0..bs {
                    for j in 0..bs {
                        yr[i] += d[(i, j)] * xr[j];
                    }
                }
            }
        }
    }
}
