//! Dense square matrix buffers.
//!
//! A [`Matrix`] owns one flat row-major `f64` buffer backed by an
//! [`ndarray::Array2`]. Allocation is fallible: a buffer that cannot be
//! reserved surfaces as [`BenchError::Allocation`](crate::error::BenchError)
//! instead of aborting the process, so a sweep can report it and stop.

use std::mem;

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::error::{allocation_error, validation_error, Result};

/// Number of leading values of the first output row kept for display.
pub const PREVIEW_LEN: usize = 10;

/// A dense `n x n` matrix stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Array2<f64>,
}

impl Matrix {
    /// Allocates an `n x n` matrix filled with zeros.
    pub fn zeros(n: usize) -> Result<Self> {
        Self::from_fn(n, |_, _| 0.0)
    }

    /// Allocates an `n x n` matrix whose element `(i, j)` is `f(i, j)`.
    pub fn from_fn(n: usize, f: impl Fn(usize, usize) -> f64) -> Result<Self> {
        let mut buffer = reserve_buffer(n)?;
        for i in 0..n {
            for j in 0..n {
                buffer.push(f(i, j));
            }
        }
        Self::from_buffer(n, buffer)
    }

    /// Wraps an existing row-major buffer of exactly `n * n` values.
    pub fn from_vec(n: usize, values: Vec<f64>) -> Result<Self> {
        if Some(values.len()) != n.checked_mul(n) {
            return Err(validation_error(format!(
                "expected {} values for a {n}x{n} matrix, got {}",
                n.saturating_mul(n),
                values.len()
            )));
        }
        Self::from_buffer(n, values)
    }

    fn from_buffer(n: usize, buffer: Vec<f64>) -> Result<Self> {
        let data = Array2::from_shape_vec((n, n), buffer)
            .map_err(|e| validation_error(format!("invalid matrix shape: {e}")))?;
        Ok(Self { data })
    }

    /// Dimension `n` of the square matrix.
    pub fn dim(&self) -> usize {
        self.data.nrows()
    }

    /// The flat row-major buffer.
    pub fn as_slice(&self) -> &[f64] {
        self.data
            .as_slice()
            .expect("matrix storage is always contiguous row-major")
    }

    /// The flat row-major buffer, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        self.data
            .as_slice_mut()
            .expect("matrix storage is always contiguous row-major")
    }

    /// Two-dimensional view over the buffer.
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// View of row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.dim()`.
    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.data.row(i)
    }

    /// Up to `limit` leading values of the first row.
    pub fn first_row_preview(&self, limit: usize) -> Vec<f64> {
        if self.dim() == 0 {
            return Vec::new();
        }
        self.row(0).iter().take(limit).copied().collect()
    }
}

/// Reserves room for `n * n` doubles without touching the global OOM handler.
fn reserve_buffer(n: usize) -> Result<Vec<f64>> {
    let len = n
        .checked_mul(n)
        .ok_or_else(|| allocation_error(n, usize::MAX, "element count overflows usize"))?;
    let bytes = len
        .checked_mul(mem::size_of::<f64>())
        .ok_or_else(|| allocation_error(n, usize::MAX, "byte count overflows usize"))?;

    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|e| allocation_error(n, bytes, e.to_string()))?;
    Ok(buffer)
}

/// The three matrices consumed by one kernel invocation.
///
/// `A` and `B` are read-only inputs; `C` starts zeroed and is owned by the
/// invocation that fills it. Dropping the set releases all three buffers.
#[derive(Debug)]
pub struct Operands {
    a: Matrix,
    b: Matrix,
    c: Matrix,
}

impl Operands {
    /// Allocates and initializes the benchmark inputs for dimension `n`:
    /// `A` is all ones, row `i` of `B` holds `i + 1`, and `C` is zero.
    pub fn allocate(n: usize) -> Result<Self> {
        let a = Matrix::from_fn(n, |_, _| 1.0)?;
        let b = Matrix::from_fn(n, |i, _| (i + 1) as f64)?;
        let c = Matrix::zeros(n)?;
        Ok(Self { a, b, c })
    }

    /// Builds an operand set from caller-supplied inputs and a zeroed output.
    pub fn from_inputs(a: Matrix, b: Matrix) -> Result<Self> {
        if a.dim() != b.dim() {
            return Err(validation_error(format!(
                "input dimensions differ: A is {0}x{0}, B is {1}x{1}",
                a.dim(),
                b.dim()
            )));
        }
        let c = Matrix::zeros(a.dim())?;
        Ok(Self { a, b, c })
    }

    /// Dimension shared by all three matrices.
    pub fn dim(&self) -> usize {
        self.a.dim()
    }

    pub fn a(&self) -> &Matrix {
        &self.a
    }

    pub fn b(&self) -> &Matrix {
        &self.b
    }

    /// The output matrix `C`.
    pub fn output(&self) -> &Matrix {
        &self.c
    }

    /// Releases the inputs and hands back the output matrix.
    pub fn into_output(self) -> Matrix {
        self.c
    }

    /// Borrows `A` and `B` immutably and `C` mutably, as flat buffers.
    pub(crate) fn split(&mut self) -> (&[f64], &[f64], &mut [f64]) {
        (self.a.as_slice(), self.b.as_slice(), self.c.as_mut_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_has_expected_shape() {
        let m = Matrix::zeros(3).unwrap();
        assert_eq!(m.dim(), 3);
        assert_eq!(m.as_slice().len(), 9);
        assert!(m.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_from_fn_is_row_major() {
        let m = Matrix::from_fn(2, |i, j| (i * 10 + j) as f64).unwrap();
        assert_eq!(m.as_slice(), &[0.0, 1.0, 10.0, 11.0]);
        assert_eq!(m.view()[[1, 0]], 10.0);
    }

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        let err = Matrix::from_vec(2, vec![1.0; 3]).unwrap_err();
        assert!(err.to_string().contains("expected 4 values"));
    }

    #[test]
    fn test_deterministic_initializer() {
        let ops = Operands::allocate(4).unwrap();
        assert!(ops.a().as_slice().iter().all(|&v| v == 1.0));
        for i in 0..4 {
            assert!(ops.b().row(i).iter().all(|&v| v == (i + 1) as f64));
        }
        assert!(ops.output().as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_overflowing_dimension_is_an_allocation_error() {
        let err = Matrix::zeros(1 << 31).unwrap_err();
        assert!(err.is_resource_exhaustion());
    }

    #[test]
    fn test_unreservable_buffer_is_an_allocation_error() {
        // 2^60 doubles fits in usize bytes but exceeds isize::MAX.
        let err = Matrix::zeros(1 << 30).unwrap_err();
        assert!(err.is_resource_exhaustion());
    }

    #[test]
    fn test_first_row_preview_is_truncated() {
        let m = Matrix::from_fn(12, |_, j| j as f64).unwrap();
        let preview = m.first_row_preview(PREVIEW_LEN);
        assert_eq!(preview.len(), PREVIEW_LEN);
        assert_eq!(preview[9], 9.0);
        assert!(Matrix::zeros(0).unwrap().first_row_preview(4).is_empty());
    }

    #[test]
    fn test_from_inputs_rejects_mismatched_dimensions() {
        let a = Matrix::zeros(2).unwrap();
        let b = Matrix::zeros(3).unwrap();
        assert!(Operands::from_inputs(a, b).is_err());
    }
}
