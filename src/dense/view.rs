use crate::traits::MatrixRef;

use super::DenseMatrix;

/// Lazily transposed view of a matrix.
///
/// Presents `inner` with its dimensions swapped: element `(r, c)` of the view
/// reads element `(c, r)` of the inner matrix. Nothing is copied.
///
/// ```
/// use densestore::{DenseMatrix, MatrixRef};
/// let a = DenseMatrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
/// let t = a.t();
/// assert_eq!((t.nrows(), t.ncols()), (3, 2));
/// assert_eq!(t.get(2, 0), 3.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Transposed<'a, M: ?Sized> {
    inner: &'a M,
}

impl<'a, M: ?Sized> Transposed<'a, M> {
    pub fn new(inner: &'a M) -> Self {
        Self { inner }
    }

    /// The matrix being viewed.
    pub fn inner(&self) -> &'a M {
        self.inner
    }
}

impl<T, M: MatrixRef<T> + ?Sized> MatrixRef<T> for Transposed<'_, M> {
    #[inline]
    fn nrows(&self) -> usize {
        self.inner.ncols()
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.inner.nrows()
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> T {
        self.inner.get(col, row)
    }
}

/// A multiplication operand: either dense storage or any other matrix-like
/// value.
///
/// Dense operands let the product kernel walk contiguous columns; views fall
/// back to element access.
///
/// ```
/// use densestore::{DenseMatrix, Operand};
/// let a = DenseMatrix::<f64>::identity(2);
/// let t = a.t();
/// assert!(Operand::from(&a).as_dense().is_some());
/// assert!(Operand::<f64>::view(&t).as_dense().is_none());
/// ```
#[derive(Clone, Copy)]
pub enum Operand<'a, T> {
    Dense(&'a DenseMatrix<T>),
    View(&'a dyn MatrixRef<T>),
}

impl<'a, T> Operand<'a, T> {
    /// Wrap any matrix-like value as a view operand.
    pub fn view(matrix: &'a dyn MatrixRef<T>) -> Self {
        Operand::View(matrix)
    }

    /// The dense storage, if this operand has any.
    pub fn as_dense(&self) -> Option<&'a DenseMatrix<T>> {
        match *self {
            Operand::Dense(m) => Some(m),
            Operand::View(_) => None,
        }
    }
}

impl<'a, T> From<&'a DenseMatrix<T>> for Operand<'a, T> {
    fn from(m: &'a DenseMatrix<T>) -> Self {
        Operand::Dense(m)
    }
}

impl<T: Copy + Sync> MatrixRef<T> for Operand<'_, T> {
    #[inline]
    fn nrows(&self) -> usize {
        match self {
            Operand::Dense(m) => m.nrows,
            Operand::View(v) => v.nrows(),
        }
    }

    #[inline]
    fn ncols(&self) -> usize {
        match self {
            Operand::Dense(m) => m.ncols,
            Operand::View(v) => v.ncols(),
        }
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> T {
        match self {
            Operand::Dense(m) => MatrixRef::get(*m, row, col),
            Operand::View(v) => v.get(row, col),
        }
    }
}

impl<T> core::fmt::Debug for Operand<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Operand::Dense(m) => write!(f, "Operand::Dense({}x{})", m.nrows, m.ncols),
            Operand::View(v) => write!(f, "Operand::View({}x{})", v.nrows(), v.ncols()),
        }
    }
}
