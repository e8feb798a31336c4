//! Distance matrix storage and the read contract consumed by the engine.
//!
//! The engine never mutates a matrix. It only needs cell reads, row sums over
//! a subset of columns, and k-th smallest queries per row, which is what
//! [`DistanceMatrix`] exposes. [`DenseMatrix`] is the row-major in-memory
//! implementation used by the loader and the CLI.

use crate::error::{MeanShiftError, Result};
use crate::stats::kth_smallest;
use rand::Rng;
use std::ops::RangeInclusive;

/// Read-only view of a pairwise distance table.
///
/// Implementations are expected to satisfy `d[i][i] == 0`, `d[i][j] >= 0`,
/// and `d[i][j] == d[j][i]`. Symmetry is assumed, not validated.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: a single matrix is read from every
/// worker thread during a clustering run without locking.
pub trait DistanceMatrix: Send + Sync {
    /// Number of rows (points).
    fn rows(&self) -> usize;

    /// Number of columns.
    fn cols(&self) -> usize;

    /// Distance between points `i` and `j`.
    ///
    /// # Panics
    /// Panics if `i` or `j` is out of bounds.
    fn get(&self, i: usize, j: usize) -> f32;

    /// Sum of `d[i][j]` over the given columns.
    fn row_sum(&self, i: usize, columns: &[usize]) -> f32 {
        columns.iter().map(|&j| self.get(i, j)).sum()
    }

    /// The k-th smallest distance in row `i`, with `k` starting at 1.
    ///
    /// # Errors
    /// Returns `KthOutOfRange` if `k == 0` or `k > cols()`.
    fn kth_smallest_in_row(&self, i: usize, k: usize) -> Result<f32> {
        let row: Vec<f32> = (0..self.cols()).map(|j| self.get(i, j)).collect();
        kth_smallest(&row, k)
    }

    /// Return true if the matrix has no rows.
    fn is_empty(&self) -> bool {
        self.rows() == 0
    }

    /// Check that the matrix pairs every point with every point.
    ///
    /// # Errors
    /// Returns `InvalidParameter` if `rows() != cols()`.
    fn ensure_square(&self) -> Result<()> {
        if self.rows() != self.cols() {
            return Err(MeanShiftError::invalid_parameter(format!(
                "distance matrix must be square, got {}x{}",
                self.rows(),
                self.cols()
            )));
        }
        Ok(())
    }
}

/// Row-major dense matrix of `f32` values.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f32>,
}

impl DenseMatrix {
    /// Create a zero-filled matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: vec![0.0; rows * cols],
        }
    }

    /// Build a matrix from a list of rows.
    ///
    /// The column count is taken from the first row.
    ///
    /// # Errors
    /// Returns `InvalidParameter` if any row has a different length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(rows.len() * cols);

        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(MeanShiftError::invalid_parameter(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    cols
                )));
            }
            values.extend_from_slice(row);
        }

        Ok(Self {
            rows: rows.len(),
            cols,
            values,
        })
    }

    /// Generate a random symmetric distance matrix with a zero diagonal and
    /// off-diagonal values uniform in `[0, 1)`.
    pub fn random_symmetric<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Self {
        let mut m = Self::new(n, n);
        for i in 0..n {
            for j in (i + 1)..n {
                let v: f32 = rng.gen();
                m.set(i, j, v);
                m.set(j, i, v);
            }
        }
        m
    }

    /// Set the value at `(i, j)`.
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f32) {
        self.values[i * self.cols + j] = value;
    }

    /// Borrow row `i` as a slice.
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.values[i * self.cols..(i + 1) * self.cols]
    }

    /// Sum of every row.
    pub fn row_sums(&self) -> Vec<f32> {
        (0..self.rows).map(|i| self.row(i).iter().sum()).collect()
    }

    /// Column index of the smallest value in row `i`, or `None` for a
    /// zero-width matrix. The first minimum wins.
    pub fn argmin_in_row(&self, i: usize) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (j, &v) in self.row(i).iter().enumerate() {
            if best.map_or(true, |(_, min)| v < min) {
                best = Some((j, v));
            }
        }
        best.map(|(j, _)| j)
    }

    /// Divide every value in row `i` by `divisor`.
    pub fn divide_row(&mut self, i: usize, divisor: f32) {
        let cols = self.cols;
        for v in &mut self.values[i * cols..(i + 1) * cols] {
            *v /= divisor;
        }
    }

    /// Copy out the inclusive block `rows x cols`.
    ///
    /// # Errors
    /// Returns `InvalidParameter` if either range is empty or out of bounds.
    pub fn submatrix(&self, rows: RangeInclusive<usize>, cols: RangeInclusive<usize>) -> Result<Self> {
        let (i0, i1) = (*rows.start(), *rows.end());
        let (j0, j1) = (*cols.start(), *cols.end());

        if i0 > i1 || j0 > j1 || i1 >= self.rows || j1 >= self.cols {
            return Err(MeanShiftError::invalid_parameter(format!(
                "submatrix {}..={} x {}..={} out of bounds for {}x{} matrix",
                i0, i1, j0, j1, self.rows, self.cols
            )));
        }

        let mut sub = Self::new(i1 - i0 + 1, j1 - j0 + 1);
        for i in i0..=i1 {
            sub.values[(i - i0) * sub.cols..(i - i0 + 1) * sub.cols]
                .copy_from_slice(&self.row(i)[j0..=j1]);
        }
        Ok(sub)
    }
}

impl DistanceMatrix for DenseMatrix {
    #[inline]
    fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn get(&self, i: usize, j: usize) -> f32 {
        self.values[i * self.cols + j]
    }

    fn row_sum(&self, i: usize, columns: &[usize]) -> f32 {
        let row = self.row(i);
        columns.iter().map(|&j| row[j]).sum()
    }

    fn kth_smallest_in_row(&self, i: usize, k: usize) -> Result<f32> {
        kth_smallest(self.row(i), k)
    }
}
