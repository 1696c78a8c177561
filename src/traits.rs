use core::fmt::Debug;
use num_traits::{Float, Num, One, Zero};

/// Trait for types that can be stored in a [`DenseMatrix`](crate::DenseMatrix).
///
/// Blanket-implemented for all types satisfying the bounds. `Send + Sync`
/// is required so the fork-join kernels can hand column blocks to worker
/// threads.
pub trait Scalar: Copy + PartialEq + Debug + Zero + One + Num + Send + Sync {}

impl<T: Copy + PartialEq + Debug + Zero + One + Num + Send + Sync> Scalar for T {}

/// Trait for floating-point matrix elements.
///
/// Required by everything that needs `sqrt`, `abs` or machine epsilon:
/// norms, plane transforms, the Hessenberg reducer and the Schur engine.
pub trait FloatScalar: Scalar + Float {
    /// `0.5` in the element type.
    #[inline]
    fn half() -> Self {
        Self::one() / (Self::one() + Self::one())
    }

    /// `2.0` in the element type.
    #[inline]
    fn two() -> Self {
        Self::one() + Self::one()
    }

    /// Convert an `f64` literal into the element type.
    ///
    /// Used for the fixed shift constants of the QR iteration; every
    /// constant fed through here is representable in `f32`.
    #[inline]
    fn lit(v: f64) -> Self {
        <Self as num_traits::NumCast>::from(v).unwrap_or_else(Self::nan)
    }
}

impl<T: Scalar + Float> FloatScalar for T {}

/// Read-only access to a matrix-like type.
///
/// This is the capability contract every operand of the kernels exposes:
/// dimensions and element access. Implemented by [`DenseMatrix`](crate::DenseMatrix)
/// and by lazily evaluated views such as [`Transposed`](crate::dense::Transposed).
///
/// `get` is unchecked by contract: indices outside `[0, nrows) x [0, ncols)`
/// panic.
pub trait MatrixRef<T>: Sync {
    fn nrows(&self) -> usize;
    fn ncols(&self) -> usize;
    fn get(&self, row: usize, col: usize) -> T;
}

/// Mutable access to a matrix-like type.
///
/// Extends `MatrixRef` with mutable element access and contiguous column
/// slices. Column-major storage guarantees `col_as_mut_slice` regions of
/// different columns never overlap.
pub trait MatrixMut<T>: MatrixRef<T> {
    fn get_mut(&mut self, row: usize, col: usize) -> &mut T;

    /// Rows `row_start..nrows` of column `col` as a contiguous slice.
    fn col_as_slice(&self, col: usize, row_start: usize) -> &[T];

    /// Mutable rows `row_start..nrows` of column `col`.
    fn col_as_mut_slice(&mut self, col: usize, row_start: usize) -> &mut [T];
}

impl<T, M: MatrixRef<T> + ?Sized> MatrixRef<T> for &M {
    #[inline]
    fn nrows(&self) -> usize {
        (**self).nrows()
    }

    #[inline]
    fn ncols(&self) -> usize {
        (**self).ncols()
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> T {
        (**self).get(row, col)
    }
}
