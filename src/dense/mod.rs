mod ops;
mod util;
mod view;

pub use view::{Operand, Transposed};

use core::ops::{Index, IndexMut};

use rand::Rng;
use rand_distr::Distribution;

use crate::error::{Error, Result};
use crate::parallel::{self, Columns, KernelKind};
use crate::traits::{MatrixMut, MatrixRef, Scalar};

/// Heap-allocated dense matrix with runtime dimensions.
///
/// Column-major `Vec<T>` storage: element `(r, c)` lives at linear index
/// `r + nrows * c`. Dimensions are fixed at construction; only element
/// values change afterwards.
///
/// Element access comes in two flavours. [`get`](Self::get) and
/// [`set`](Self::set) check their indices and return
/// [`Error::OutOfRange`]. `Index`/`IndexMut` with `(row, col)` panic on
/// out-of-range input, like slice indexing.
///
/// # Examples
///
/// ```
/// use densestore::DenseMatrix;
///
/// let a = DenseMatrix::from_rows(2, 2, &[1.0_f64, 2.0, 3.0, 4.0]).unwrap();
/// assert_eq!(a[(0, 1)], 2.0);
/// assert_eq!(a.nrows(), 2);
/// assert_eq!(a.ncols(), 2);
///
/// let b = DenseMatrix::<f64>::identity(3);
/// assert_eq!(b[(0, 0)], 1.0);
/// assert_eq!(b[(0, 1)], 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix<T> {
    pub(crate) data: Vec<T>,
    pub(crate) nrows: usize,
    pub(crate) ncols: usize,
}

// ── Constructors ────────────────────────────────────────────────────

impl<T: Scalar> DenseMatrix<T> {
    /// Create an `nrows x ncols` matrix of zeros.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let m = DenseMatrix::<f64>::zeros(2, 3);
    /// assert_eq!(m.nrows(), 2);
    /// assert_eq!(m.ncols(), 3);
    /// assert_eq!(m[(1, 2)], 0.0);
    /// ```
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self::fill(nrows, ncols, T::zero())
    }

    /// Create a matrix filled with a given value.
    pub fn fill(nrows: usize, ncols: usize, value: T) -> Self {
        Self {
            data: vec![value; element_count(nrows, ncols)],
            nrows,
            ncols,
        }
    }

    /// Create an `n x n` identity matrix.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let id = DenseMatrix::<f64>::identity(3);
    /// assert_eq!(id[(0, 0)], 1.0);
    /// assert_eq!(id[(0, 1)], 0.0);
    /// assert_eq!(id[(2, 2)], 1.0);
    /// ```
    pub fn identity(n: usize) -> Self {
        Self::eye(n, n)
    }

    /// Rectangular identity: ones on the main diagonal, zeros elsewhere.
    pub fn eye(nrows: usize, ncols: usize) -> Self {
        let mut m = Self::zeros(nrows, ncols);
        for i in 0..nrows.min(ncols) {
            m[(i, i)] = T::one();
        }
        m
    }

    /// Create a matrix from a flat slice in column-major order.
    ///
    /// Fails with [`Error::ShapeMismatch`] if `slice.len() != nrows * ncols`.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// // Column-major: col0=[1,3], col1=[2,4]
    /// let m = DenseMatrix::from_slice(2, 2, &[1.0, 3.0, 2.0, 4.0]).unwrap();
    /// assert_eq!(m[(1, 0)], 3.0);
    /// assert_eq!(m[(0, 1)], 2.0);
    ///
    /// assert!(DenseMatrix::from_slice(2, 2, &[1.0, 2.0, 3.0]).is_err());
    /// ```
    pub fn from_slice(nrows: usize, ncols: usize, slice: &[T]) -> Result<Self> {
        Self::from_vec(nrows, ncols, slice.to_vec())
    }

    /// Create a matrix from a flat slice in row-major order.
    ///
    /// Transposes the data to column-major internal storage.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let m = DenseMatrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    /// assert_eq!(m[(0, 2)], 3.0);
    /// assert_eq!(m[(1, 0)], 4.0);
    /// ```
    pub fn from_rows(nrows: usize, ncols: usize, row_major: &[T]) -> Result<Self> {
        check_len(row_major.len(), nrows, ncols)?;
        Ok(Self::from_fn(nrows, ncols, |i, j| row_major[i * ncols + j]))
    }

    /// Create a matrix from a random distribution.
    ///
    /// Elements are drawn in storage (column-major) order, so a seeded `rng`
    /// reproduces the same matrix.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// use rand::{rngs::StdRng, SeedableRng};
    /// use rand_distr::Uniform;
    ///
    /// let dist = Uniform::new(-1.0_f64, 1.0).unwrap();
    /// let a = DenseMatrix::random(3, 4, &dist, &mut StdRng::seed_from_u64(7));
    /// let b = DenseMatrix::random(3, 4, &dist, &mut StdRng::seed_from_u64(7));
    /// assert_eq!(a, b);
    /// assert!(a.as_slice().iter().all(|x| (-1.0..1.0).contains(x)));
    /// ```
    pub fn random<D, R>(nrows: usize, ncols: usize, distribution: &D, rng: &mut R) -> Self
    where
        D: Distribution<T>,
        R: Rng + ?Sized,
    {
        let data = (0..element_count(nrows, ncols)).map(|_| distribution.sample(rng)).collect();
        Self { data, nrows, ncols }
    }

    /// Copy any matrix-like source into a new dense matrix.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let a = DenseMatrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    /// let at = DenseMatrix::copy_from(&a.t());
    /// assert_eq!(at.nrows(), 3);
    /// assert_eq!(at[(2, 1)], 6.0);
    /// ```
    pub fn copy_from(source: &impl MatrixRef<T>) -> Self {
        let mut m = Self::zeros(source.nrows(), source.ncols());
        fill_columns_from(&mut m, source);
        m
    }
}

impl<T> DenseMatrix<T> {
    /// Create a matrix from an owned `Vec<T>` in column-major order.
    ///
    /// Fails with [`Error::ShapeMismatch`] if `data.len() != nrows * ncols`.
    pub fn from_vec(nrows: usize, ncols: usize, data: Vec<T>) -> Result<Self> {
        check_len(data.len(), nrows, ncols)?;
        Ok(Self { data, nrows, ncols })
    }

    /// Create a matrix by calling `f(row, col)` for each element.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let m = DenseMatrix::from_fn(3, 3, |i, j| if i == j { 1.0_f64 } else { 0.0 });
    /// assert_eq!(m[(0, 0)], 1.0);
    /// assert_eq!(m[(0, 1)], 0.0);
    /// ```
    pub fn from_fn(nrows: usize, ncols: usize, f: impl Fn(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(element_count(nrows, ncols));
        for j in 0..ncols {
            for i in 0..nrows {
                data.push(f(i, j));
            }
        }
        Self { data, nrows, ncols }
    }

    /// Number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// `(nrows, ncols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Whether the matrix is square.
    #[inline]
    pub fn is_square(&self) -> bool {
        self.nrows == self.ncols
    }

    /// Column-major backing storage.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutable column-major backing storage.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consume the matrix, returning its column-major storage.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Column `col` as a contiguous slice.
    #[inline]
    pub fn col(&self, col: usize) -> &[T] {
        let start = col * self.nrows;
        &self.data[start..start + self.nrows]
    }

    /// Column `col` as a mutable contiguous slice.
    #[inline]
    pub fn col_mut(&mut self, col: usize) -> &mut [T] {
        let start = col * self.nrows;
        &mut self.data[start..start + self.nrows]
    }

    /// The whole matrix as a splittable block of columns.
    #[inline]
    pub(crate) fn columns_mut(&mut self) -> Columns<'_, T> {
        Columns::new(&mut self.data, self.nrows, self.ncols)
    }

    /// Columns `first..ncols` as a splittable block.
    #[inline]
    pub(crate) fn columns_from_mut(&mut self, first: usize) -> Columns<'_, T> {
        let start = first * self.nrows;
        Columns::new(&mut self.data[start..], self.nrows, self.ncols - first)
    }

    #[inline]
    fn check_index(&self, row: usize, col: usize) -> Result<()> {
        if row < self.nrows && col < self.ncols {
            Ok(())
        } else {
            Err(Error::OutOfRange {
                row,
                col,
                rows: self.nrows,
                cols: self.ncols,
            })
        }
    }
}

// ── Checked access / structural ops ─────────────────────────────────

impl<T: Copy> DenseMatrix<T> {
    /// Element at `(row, col)`, or [`Error::OutOfRange`].
    ///
    /// ```
    /// use densestore::{DenseMatrix, Error};
    /// let m = DenseMatrix::<f64>::identity(2);
    /// assert_eq!(m.get(1, 1), Ok(1.0));
    /// assert!(matches!(m.get(2, 0), Err(Error::OutOfRange { .. })));
    /// ```
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.check_index(row, col)?;
        Ok(self.data[row + self.nrows * col])
    }

    /// Overwrite the element at `(row, col)`, or return [`Error::OutOfRange`].
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        self.check_index(row, col)?;
        self.data[row + self.nrows * col] = value;
        Ok(())
    }

    /// Swap two rows in place.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let mut m = DenseMatrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
    /// m.exchange_rows(0, 1).unwrap();
    /// assert_eq!(m[(0, 0)], 3.0);
    /// assert_eq!(m[(1, 1)], 2.0);
    /// ```
    pub fn exchange_rows(&mut self, a: usize, b: usize) -> Result<()> {
        if a.max(b) >= self.nrows {
            return Err(Error::OutOfRange {
                row: a.max(b),
                col: 0,
                rows: self.nrows,
                cols: self.ncols,
            });
        }
        self.swap_rows(a, b);
        Ok(())
    }

    /// Swap two columns in place.
    pub fn exchange_columns(&mut self, a: usize, b: usize) -> Result<()> {
        if a.max(b) >= self.ncols {
            return Err(Error::OutOfRange {
                row: 0,
                col: a.max(b),
                rows: self.nrows,
                cols: self.ncols,
            });
        }
        self.swap_columns(a, b);
        Ok(())
    }

    /// Row swap for indices already known to be in range.
    pub(crate) fn swap_rows(&mut self, a: usize, b: usize) {
        if a != b {
            let n = self.nrows;
            for j in 0..self.ncols {
                self.data.swap(a + n * j, b + n * j);
            }
        }
    }

    /// Column swap for indices already known to be in range.
    pub(crate) fn swap_columns(&mut self, a: usize, b: usize) {
        if a != b {
            let n = self.nrows;
            let (lo, hi) = (a.min(b), a.max(b));
            let (left, right) = self.data.split_at_mut(hi * n);
            left[lo * n..(lo + 1) * n].swap_with_slice(&mut right[..n]);
        }
    }
}

impl<T: Scalar> DenseMatrix<T> {
    /// Negate every element of column `col`.
    pub fn negate_column(&mut self, col: usize) {
        for x in self.col_mut(col) {
            *x = T::zero() - *x;
        }
    }

    /// Turn column `col` into the unit vector `e_col` below the diagonal:
    /// one on the diagonal, zeros underneath. Entries above are untouched.
    pub fn set_to_identity_column(&mut self, col: usize) {
        let column = self.col_mut(col);
        column[col] = T::one();
        for x in &mut column[col + 1..] {
            *x = T::zero();
        }
    }

    /// Transposed view of this matrix, evaluated lazily.
    #[inline]
    pub fn t(&self) -> Transposed<'_, Self> {
        Transposed::new(self)
    }

    /// Transposed copy.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let m = DenseMatrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    /// let t = m.transpose();
    /// assert_eq!(t.shape(), (3, 2));
    /// assert_eq!(t[(2, 0)], 3.0);
    /// assert_eq!(t.transpose(), m);
    /// ```
    pub fn transpose(&self) -> Self {
        Self::copy_from(&self.t())
    }
}

/// `nrows · ncols`, panicking like `Vec` does on a capacity overflow.
fn element_count(nrows: usize, ncols: usize) -> usize {
    nrows
        .checked_mul(ncols)
        .unwrap_or_else(|| panic!("matrix dimensions {nrows}x{ncols} overflow usize"))
}

fn check_len(len: usize, nrows: usize, ncols: usize) -> Result<()> {
    if nrows.checked_mul(ncols) == Some(len) {
        Ok(())
    } else {
        // Report the sequence as a single column of `len` values.
        Err(Error::shape((nrows, ncols), (len, 1)))
    }
}

/// Column-parallel copy of `source` into `dest` (same shape).
pub(crate) fn fill_columns_from<T: Scalar>(dest: &mut DenseMatrix<T>, source: &(impl MatrixRef<T> + ?Sized)) {
    parallel::dispatch(KernelKind::Fill, 0, dest.columns_mut(), &|first, mut block: Columns<'_, T>| {
        for local in 0..block.ncols() {
            let j = first + local;
            for (i, x) in block.col_mut(local).iter_mut().enumerate() {
                *x = source.get(i, j);
            }
        }
    });
}

// ── MatrixRef / MatrixMut ───────────────────────────────────────────

impl<T: Copy + Sync> MatrixRef<T> for DenseMatrix<T> {
    #[inline]
    fn nrows(&self) -> usize {
        self.nrows
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> T {
        self.data[col * self.nrows + row]
    }
}

impl<T: Copy + Sync> MatrixMut<T> for DenseMatrix<T> {
    #[inline]
    fn get_mut(&mut self, row: usize, col: usize) -> &mut T {
        &mut self.data[col * self.nrows + row]
    }

    #[inline]
    fn col_as_slice(&self, col: usize, row_start: usize) -> &[T] {
        let start = col * self.nrows + row_start;
        let end = col * self.nrows + self.nrows;
        &self.data[start..end]
    }

    #[inline]
    fn col_as_mut_slice(&mut self, col: usize, row_start: usize) -> &mut [T] {
        let start = col * self.nrows + row_start;
        let end = col * self.nrows + self.nrows;
        &mut self.data[start..end]
    }
}

// ── Index ───────────────────────────────────────────────────────────

impl<T> Index<(usize, usize)> for DenseMatrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &T {
        assert!(
            row < self.nrows && col < self.ncols,
            "index ({row}, {col}) out of range for {}x{} matrix",
            self.nrows,
            self.ncols
        );
        &self.data[col * self.nrows + row]
    }
}

impl<T> IndexMut<(usize, usize)> for DenseMatrix<T> {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        assert!(
            row < self.nrows && col < self.ncols,
            "index ({row}, {col}) out of range for {}x{} matrix",
            self.nrows,
            self.ncols
        );
        &mut self.data[col * self.nrows + row]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use rand_distr::StandardNormal;

    #[test]
    fn zeros() {
        let m = DenseMatrix::<f64>::zeros(3, 4);
        assert_eq!(m.shape(), (3, 4));
        assert!(m.as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn fill() {
        let m = DenseMatrix::fill(2, 3, 7.0_f64);
        for i in 0..2 {
            for j in 0..3 {
                assert_eq!(m[(i, j)], 7.0);
            }
        }
    }

    #[test]
    fn eye_rectangular() {
        let m = DenseMatrix::<f64>::eye(2, 3);
        for i in 0..2 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_eq!(m[(i, j)], expected);
            }
        }
    }

    #[test]
    fn column_major_layout() {
        let m = DenseMatrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(m.as_slice(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(m.col(1), &[2.0, 5.0]);
    }

    #[test]
    fn from_vec_wrong_length() {
        let err = DenseMatrix::from_vec(2, 2, vec![1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            Error::ShapeMismatch {
                expected: (2, 2),
                got: (3, 1)
            }
        );
    }

    #[test]
    fn from_rows_wrong_length() {
        assert!(DenseMatrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0, 5.0]).is_err());
    }

    #[test]
    fn overflowing_dimensions_rejected() {
        // usize::MAX · 2 wraps to usize::MAX − 1 without the checked product.
        let data = vec![0.0_f64; 0];
        let err = DenseMatrix::from_vec(usize::MAX, 2, data).unwrap_err();
        assert_eq!(err, Error::ShapeMismatch { expected: (usize::MAX, 2), got: (0, 1) });
        assert!(DenseMatrix::<f64>::from_slice(2, usize::MAX / 2 + 1, &[]).is_err());
    }

    #[test]
    #[should_panic(expected = "overflow usize")]
    fn overflowing_fill_panics() {
        let _ = DenseMatrix::<f64>::zeros(usize::MAX, 3);
    }

    #[test]
    fn empty_matrices() {
        let m = DenseMatrix::<f64>::zeros(0, 3);
        assert_eq!(m.shape(), (0, 3));
        assert!(m.as_slice().is_empty());
        let e = DenseMatrix::from_vec(0, 0, Vec::<f64>::new()).unwrap();
        assert!(e.is_square());
    }

    #[test]
    fn checked_access() {
        let mut m = DenseMatrix::<f64>::zeros(2, 2);
        m.set(0, 1, 5.0).unwrap();
        assert_eq!(m.get(0, 1), Ok(5.0));
        assert_eq!(m[(0, 1)], 5.0);
        assert!(matches!(m.set(0, 2, 1.0), Err(Error::OutOfRange { col: 2, .. })));
        assert!(matches!(m.get(2, 0), Err(Error::OutOfRange { row: 2, .. })));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn index_out_of_range_panics() {
        let m = DenseMatrix::<f64>::zeros(2, 2);
        let _ = m[(0, 2)];
    }

    #[test]
    fn exchange_rows_and_columns() {
        let mut m = DenseMatrix::from_rows(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]).unwrap();
        m.exchange_rows(0, 2).unwrap();
        assert_eq!(m[(0, 0)], 7.0);
        assert_eq!(m[(2, 2)], 3.0);
        m.exchange_columns(2, 0).unwrap();
        assert_eq!(m[(0, 0)], 9.0);
        assert_eq!(m[(0, 2)], 7.0);
        assert_eq!(m[(1, 0)], 6.0);
        assert!(m.exchange_rows(0, 3).is_err());
        assert!(m.exchange_columns(3, 0).is_err());
    }

    #[test]
    fn negate_and_identity_column() {
        let mut m = DenseMatrix::fill(3, 3, 2.0_f64);
        m.negate_column(1);
        assert_eq!(m.col(1), &[-2.0, -2.0, -2.0]);
        m.set_to_identity_column(1);
        assert_eq!(m.col(1), &[-2.0, 1.0, 0.0]);
    }

    #[test]
    fn random_is_reproducible() {
        let a: DenseMatrix<f64> = DenseMatrix::random(4, 5, &StandardNormal, &mut StdRng::seed_from_u64(42));
        let b: DenseMatrix<f64> = DenseMatrix::random(4, 5, &StandardNormal, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
        assert!(a.as_slice().iter().any(|&x| x != 0.0));
    }

    #[test]
    fn copy_from_view() {
        let m = DenseMatrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let c = DenseMatrix::copy_from(&m);
        assert_eq!(c, m);
        let t = DenseMatrix::copy_from(&m.t());
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t[(1, 0)], 2.0);
    }

    #[test]
    fn matrix_ref_trait() {
        let m = DenseMatrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        fn trace<T: Scalar>(m: &impl MatrixRef<T>) -> T {
            let mut sum = T::zero();
            for i in 0..m.nrows().min(m.ncols()) {
                sum = sum + m.get(i, i);
            }
            sum
        }
        assert_eq!(trace(&m), 5.0);
    }

    #[test]
    fn matrix_mut_trait() {
        fn scale_below<T: Scalar>(m: &mut impl MatrixMut<T>, col: usize, row: usize, by: T) {
            for x in m.col_as_mut_slice(col, row) {
                *x = *x * by;
            }
        }
        let mut m = DenseMatrix::from_rows(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        scale_below(&mut m, 1, 1, 10.0);
        assert_eq!(m.col(1), &[2.0, 40.0, 60.0]);
        *m.get_mut(0, 0) = -1.0;
        assert_eq!(m.col_as_slice(0, 0), &[-1.0, 3.0, 5.0]);
    }
}
