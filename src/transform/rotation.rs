use core::ops::Range;

use crate::dense::DenseMatrix;
use crate::parallel::{self, Columns, KernelKind};
use crate::traits::FloatScalar;

/// A Givens rotation acting on rows (or columns) `low` and `high`:
///
/// ```text
/// low'  = cos·low  + sin·high
/// high' = cos·high − sin·low
/// ```
///
/// Degenerate rotations encode simpler operations. With `low == high` the
/// single row is scaled by `cos`, or divided by `sin` when `cos` is NaN, or
/// negated when both are NaN. With `low != high` and a NaN component the two
/// rows are exchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation<T> {
    pub low: usize,
    pub high: usize,
    pub cos: T,
    pub sin: T,
}

impl<T: FloatScalar> Rotation<T> {
    pub fn new(low: usize, high: usize, cos: T, sin: T) -> Self {
        Self { low, high, cos, sin }
    }

    /// The rotation that zeroes `b` in the pair `(a, b)`.
    ///
    /// ```
    /// use densestore::transform::Rotation;
    /// let r = Rotation::zeroing(0, 1, 3.0_f64, 4.0);
    /// assert!((r.cos - 0.6).abs() < 1e-15);
    /// assert!((r.sin - 0.8).abs() < 1e-15);
    /// ```
    pub fn zeroing(low: usize, high: usize, a: T, b: T) -> Self {
        let r = a.hypot(b);
        if r == T::zero() {
            Self::new(low, high, T::one(), T::zero())
        } else {
            Self::new(low, high, a / r, b / r)
        }
    }

    /// Apply from the left: combines rows `low` and `high`.
    ///
    /// # Panics
    ///
    /// If either index is not a row of `m`.
    pub fn transform_left(&self, m: &mut DenseMatrix<T>) {
        assert!(self.low < m.nrows() && self.high < m.nrows(), "rotation rows out of range");
        if self.low != self.high {
            if self.cos.is_nan() || self.sin.is_nan() {
                m.swap_rows(self.low, self.high);
            } else {
                let ncols = m.ncols();
                rotate_rows(m, self.low, self.high, self.cos, self.sin, 0..ncols);
            }
        } else {
            let f = self.scaling();
            m.modify_row(self.low, 0, f);
        }
    }

    /// Apply from the right: combines columns `low` and `high`.
    ///
    /// # Panics
    ///
    /// If either index is not a column of `m`.
    pub fn transform_right(&self, m: &mut DenseMatrix<T>) {
        assert!(self.low < m.ncols() && self.high < m.ncols(), "rotation columns out of range");
        if self.low != self.high {
            if self.cos.is_nan() || self.sin.is_nan() {
                m.swap_columns(self.low, self.high);
            } else {
                let nrows = m.nrows();
                rotate_columns(m, self.low, self.high, self.cos, self.sin, 0..nrows);
            }
        } else {
            let f = self.scaling();
            m.modify_column(0, self.high, f);
        }
    }

    fn scaling(&self) -> impl Fn(T) -> T {
        let (cos, sin) = (self.cos, self.sin);
        move |x| {
            if !cos.is_nan() {
                cos * x
            } else if !sin.is_nan() {
                x / sin
            } else {
                -x
            }
        }
    }
}

/// Rotate rows `low` and `high` over the given column range.
///
/// Each column touches two elements, so the work is split over columns.
pub fn rotate_rows<T: FloatScalar>(m: &mut DenseMatrix<T>, low: usize, high: usize, cos: T, sin: T, cols: Range<usize>) {
    assert!(low < m.nrows() && high < m.nrows(), "rotation rows out of range");
    if cols.is_empty() {
        return;
    }
    let nrows = m.nrows();
    let data = &mut m.as_mut_slice()[cols.start * nrows..cols.end * nrows];
    let block = Columns::new(data, nrows, cols.len());
    parallel::dispatch(KernelKind::Rotation, cols.start, block, &|_, mut block: Columns<'_, T>| {
        for local in 0..block.ncols() {
            let col = block.col_mut(local);
            let (a, b) = (col[low], col[high]);
            col[low] = cos * a + sin * b;
            col[high] = cos * b - sin * a;
        }
    });
}

/// Rotate columns `low` and `high` over the given row range.
///
/// The two column segments are split in lockstep over rows.
pub fn rotate_columns<T: FloatScalar>(m: &mut DenseMatrix<T>, low: usize, high: usize, cos: T, sin: T, rows: Range<usize>) {
    assert!(low != high, "rotate_columns needs two distinct columns");
    if rows.is_empty() {
        return;
    }
    let (lo_seg, hi_seg) = two_columns_mut(m, low, high, rows);
    parallel::dispatch(KernelKind::Rotation, 0, (lo_seg, hi_seg), &|_, (x, y): (&mut [T], &mut [T])| {
        for (a, b) in x.iter_mut().zip(y.iter_mut()) {
            let (p, q) = (*a, *b);
            *a = cos * p + sin * q;
            *b = cos * q - sin * p;
        }
    });
}

/// Row range `rows` of two distinct columns, as disjoint mutable slices in
/// argument order.
pub(crate) fn two_columns_mut<T>(m: &mut DenseMatrix<T>, a: usize, b: usize, rows: Range<usize>) -> (&mut [T], &mut [T]) {
    let nrows = m.nrows();
    let (lo, hi) = (a.min(b), a.max(b));
    let (left, right) = m.as_mut_slice().split_at_mut(hi * nrows);
    let lo_seg = &mut left[lo * nrows + rows.start..lo * nrows + rows.end];
    let hi_seg = &mut right[rows.start..rows.end];
    if a < b {
        (lo_seg, hi_seg)
    } else {
        (hi_seg, lo_seg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::{with_thresholds, Thresholds};

    fn sample() -> DenseMatrix<f64> {
        DenseMatrix::from_rows(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]).unwrap()
    }

    #[test]
    fn zeroing_rotation_zeroes() {
        let mut m: DenseMatrix<f64> = DenseMatrix::from_rows(2, 2, &[3.0, 1.0, 4.0, 2.0]).unwrap();
        let r = Rotation::zeroing(0, 1, m[(0, 0)], m[(1, 0)]);
        r.transform_left(&mut m);
        assert!((m[(0, 0)] - 5.0).abs() < 1e-14);
        assert!(m[(1, 0)].abs() < 1e-14);
    }

    #[test]
    fn left_right_are_transposes() {
        let r = Rotation::new(0, 2, 0.6, 0.8);
        let mut left = sample();
        r.transform_left(&mut left);
        let mut right = sample().transpose();
        r.transform_right(&mut right);
        assert_eq!(left, right.transpose());
    }

    #[test]
    fn degenerate_single_index() {
        let mut m = sample();
        Rotation::new(1, 1, 2.0, f64::NAN).transform_left(&mut m);
        assert_eq!(m.get(1, 2), Ok(12.0));
        Rotation::new(1, 1, f64::NAN, 4.0).transform_left(&mut m);
        assert_eq!(m.get(1, 0), Ok(2.0));
        Rotation::new(2, 2, f64::NAN, f64::NAN).transform_right(&mut m);
        assert_eq!(m.col(2), &[-3.0, -3.0, -9.0]);
    }

    #[test]
    fn degenerate_exchange() {
        let mut m = sample();
        Rotation::new(0, 2, f64::NAN, 0.0).transform_left(&mut m);
        assert_eq!(m.get(0, 0), Ok(7.0));
        assert_eq!(m.get(2, 0), Ok(1.0));
        Rotation::new(0, 1, 1.0, f64::NAN).transform_right(&mut m);
        assert_eq!(m.get(0, 0), Ok(8.0));
    }

    #[test]
    #[should_panic(expected = "rotation rows out of range")]
    fn exchange_outside_rows_panics() {
        let mut m = sample();
        Rotation::new(0, 3, f64::NAN, f64::NAN).transform_left(&mut m);
    }

    #[test]
    #[should_panic(expected = "rotation columns out of range")]
    fn scaling_outside_columns_panics() {
        let mut m = DenseMatrix::<f64>::zeros(4, 2);
        Rotation::new(2, 2, 2.0, 0.0).transform_right(&mut m);
    }

    #[test]
    fn range_limited_rotations() {
        let mut m = sample();
        rotate_rows(&mut m, 0, 1, 0.0, 1.0, 1..3);
        // low' = high, high' = -low on columns 1 and 2 only
        assert_eq!(m.get(0, 0), Ok(1.0));
        assert_eq!(m.get(0, 1), Ok(5.0));
        assert_eq!(m.get(1, 2), Ok(-3.0));
        rotate_columns(&mut m, 2, 0, 0.0, 1.0, 0..1);
        // column 2 (low) takes column 0 (high) on row 0 only
        assert_eq!(m.get(0, 2), Ok(1.0));
        assert_eq!(m.get(0, 0), Ok(-6.0));
        assert_eq!(m.get(1, 0), Ok(4.0));
    }

    #[test]
    fn parallel_bit_identical() {
        let base = DenseMatrix::from_fn(4, 50, |i, j| (i as f64 + 1.0) * 0.3 - j as f64 * 0.01);
        let run = |t: Thresholds| {
            with_thresholds(t, || {
                let mut m = base.clone();
                rotate_rows(&mut m, 1, 3, 0.28, 0.96, 0..50);
                rotate_columns(&mut m, 7, 40, 0.6, -0.8, 0..4);
                m
            })
        };
        assert_eq!(run(Thresholds::serial()), run(Thresholds::eager()));
    }
}
