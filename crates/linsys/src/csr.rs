use num_traits::{Float, FromPrimitive};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use thiserror::Error;

/// Minimal numeric bound needed by the sparse primitives in this crate.
///
/// Deliberately weaker than `pdhg_core::math::RealNumber` so this crate has no
/// workspace dependency on `pdhg-core`; every `RealNumber` satisfies it.
pub trait Numeric: Float + FromPrimitive + AddAssign + 'static {}
impl<T> Numeric for T where T: Float + FromPrimitive + AddAssign + 'static {}

#[derive(Debug, Error)]
pub enum SparseError {
    #[error("indptr length {found} does not match nrows + 1 ({expected})")]
    IndptrLength { found: usize, expected: usize },
    #[error("indices length {indices} does not match data length {data}")]
    IndicesDataMismatch { indices: usize, data: usize },
    #[error("column index {col} out of bounds for {ncols} columns")]
    ColumnOutOfBounds { col: usize, ncols: usize },
}

pub type SparseResult<T> = Result<T, SparseError>;

/// A sparse matrix in compressed-row (CSR) layout.
///
/// `A` and `Aᵀ` are both kept in this representation (see the design notes in
/// SPEC_FULL.md): `y = A·x` and `y = Aᵀ·y` are then both a single cache-friendly
/// pass over contiguous row slices, with no need to ever transpose at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrMatrix<T> {
    pub nrows: usize,
    pub ncols: usize,
    pub indptr: Vec<usize>,
    pub indices: Vec<usize>,
    pub data: Vec<T>,
}

impl<T> CsrMatrix<T>
where
    T: Numeric,
{
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            indptr: vec![0; nrows + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn validate(&self) -> SparseResult<()> {
        if self.indptr.len() != self.nrows + 1 {
            return Err(SparseError::IndptrLength {
                found: self.indptr.len(),
                expected: self.nrows + 1,
            });
        }
        if self.indices.len() != self.data.len() {
            return Err(SparseError::IndicesDataMismatch {
                indices: self.indices.len(),
                data: self.data.len(),
            });
        }
        if let Some(&col) = self.indices.iter().find(|&&c| c >= self.ncols) {
            return Err(SparseError::ColumnOutOfBounds {
                col,
                ncols: self.ncols,
            });
        }
        Ok(())
    }

    pub fn row(&self, row: usize) -> (&[usize], &[T]) {
        let start = self.indptr[row];
        let end = self.indptr[row + 1];
        (&self.indices[start..end], &self.data[start..end])
    }

    /// `y = A * x`. `x` has length `ncols`, `y` has length `nrows`.
    pub fn mat_vec(&self, x: &[T], y: &mut [T]) {
        debug_assert_eq!(x.len(), self.ncols);
        debug_assert_eq!(y.len(), self.nrows);
        for row in 0..self.nrows {
            let (cols, vals) = self.row(row);
            let mut acc = T::zero();
            for (&col, &val) in cols.iter().zip(vals.iter()) {
                acc += val * x[col];
            }
            y[row] = acc;
        }
    }

    /// `max_j |A_ij|` for each row `i`.
    pub fn row_inf_norms(&self) -> Vec<T> {
        let mut out = vec![T::zero(); self.nrows];
        for row in 0..self.nrows {
            let (_, vals) = self.row(row);
            let mut m = T::zero();
            for &v in vals {
                let a = v.abs();
                if a > m {
                    m = a;
                }
            }
            out[row] = m;
        }
        out
    }

    /// `sqrt(sum_j A_ij^2)` for each row `i`.
    pub fn row_l2_norms(&self) -> Vec<T> {
        let mut out = self.row_pow_sums(T::from_f64(2.0).unwrap());
        for v in out.iter_mut() {
            *v = v.sqrt();
        }
        out
    }

    /// `sum_j |A_ij|^exponent` for each row `i`, without taking the root.
    ///
    /// Used directly by Pock-Chambolle rescaling (which applies its own
    /// square root) and as the building block for `row_l2_norms`.
    pub fn row_pow_sums(&self, exponent: T) -> Vec<T> {
        let mut out = vec![T::zero(); self.nrows];
        for row in 0..self.nrows {
            let (_, vals) = self.row(row);
            let mut acc = T::zero();
            for &v in vals {
                acc += v.abs().powf(exponent);
            }
            out[row] = acc;
        }
        out
    }

    /// Apply `A <- diag(row_scale) * A * diag(col_scale)` in place.
    pub fn scale_rows_cols(&mut self, row_scale: &[T], col_scale: &[T]) {
        debug_assert_eq!(row_scale.len(), self.nrows);
        debug_assert_eq!(col_scale.len(), self.ncols);
        for row in 0..self.nrows {
            let start = self.indptr[row];
            let end = self.indptr[row + 1];
            let rs = row_scale[row];
            for idx in start..end {
                let col = self.indices[idx];
                self.data[idx] = self.data[idx] * rs * col_scale[col];
            }
        }
    }

    /// Build the transpose of this matrix, also in CSR layout.
    pub fn transpose(&self) -> Self {
        let mut indptr = vec![0usize; self.ncols + 1];
        for &col in &self.indices {
            indptr[col + 1] += 1;
        }
        for i in 0..self.ncols {
            indptr[i + 1] += indptr[i];
        }
        let mut indices = vec![0usize; self.nnz()];
        let mut data = vec![T::zero(); self.nnz()];
        let mut cursor = indptr.clone();
        for row in 0..self.nrows {
            let start = self.indptr[row];
            let end = self.indptr[row + 1];
            for idx in start..end {
                let col = self.indices[idx];
                let dest = cursor[col];
                indices[dest] = row;
                data[dest] = self.data[idx];
                cursor[col] += 1;
            }
        }
        Self {
            nrows: self.ncols,
            ncols: self.nrows,
            indptr,
            indices,
            data,
        }
    }

    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        mut triplets: Vec<(usize, usize, T)>,
    ) -> Self {
        triplets.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        let mut indptr = vec![0usize; nrows + 1];
        for &(row, _, _) in &triplets {
            indptr[row + 1] += 1;
        }
        for i in 0..nrows {
            indptr[i + 1] += indptr[i];
        }
        let indices = triplets.iter().map(|&(_, col, _)| col).collect();
        let data = triplets.iter().map(|&(_, _, val)| val).collect();
        Self {
            nrows,
            ncols,
            indptr,
            indices,
            data,
        }
    }

    pub fn identity(n: usize) -> Self
    where
        T: num_traits::One,
    {
        let triplets = (0..n).map(|i| (i, i, T::one())).collect();
        Self::from_triplets(n, n, triplets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CsrMatrix<f64> {
        // [ 2  0 -1 ]
        // [ 0  3  0 ]
        CsrMatrix::from_triplets(2, 3, vec![(0, 0, 2.0), (0, 2, -1.0), (1, 1, 3.0)])
    }

    #[test]
    fn mat_vec_matches_dense() {
        let a = sample();
        let x = [1.0, 2.0, 3.0];
        let mut y = [0.0, 0.0];
        a.mat_vec(&x, &mut y);
        assert!((y[0] - (2.0 * 1.0 - 1.0 * 3.0)).abs() < 1e-12);
        assert!((y[1] - (3.0 * 2.0)).abs() < 1e-12);
    }

    #[test]
    fn transpose_matches_mat_vec() {
        let a = sample();
        let at = a.transpose();
        let y = [1.0, -1.0];
        let mut direct = [0.0; 3];
        at.mat_vec(&y, &mut direct);
        // Aᵀ y == (yᵀ A)ᵀ: check manually for this fixture.
        assert!((direct[0] - 2.0).abs() < 1e-12);
        assert!((direct[1] - (-3.0)).abs() < 1e-12);
        assert!((direct[2] - (-1.0)).abs() < 1e-12);
    }

    #[test]
    fn row_norms() {
        let a = sample();
        let inf = a.row_inf_norms();
        assert!((inf[0] - 2.0).abs() < 1e-12);
        assert!((inf[1] - 3.0).abs() < 1e-12);
        let l2 = a.row_l2_norms();
        assert!((l2[0] - (5.0f64).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn validate_rejects_bad_shape() {
        let mut a = sample();
        a.indptr.pop();
        assert!(a.validate().is_err());
    }
}
