//! Fill, modify, reduce and axpy kernels.
//!
//! The whole-matrix kernels are parallel over columns through
//! [`parallel::dispatch`]; the range-limited `modify_*` variants touch a
//! single row, column or diagonal and always run inline.

use crate::dense::DenseMatrix;
use crate::error::{Error, Result};
use crate::parallel::{self, Columns, KernelKind};
use crate::traits::{FloatScalar, MatrixRef, Scalar};

/// Reductions supported by [`DenseMatrix::aggregate_all`].
///
/// Each has an identity, a per-element accumulation step, an associative
/// merge of partial results and a final transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregator {
    /// Σ x
    Sum,
    /// Σ x²
    SumOfSquares,
    /// Π x
    Product,
    /// max |x|
    Largest,
    /// min |x| over the nonzero elements; zero when there are none.
    Smallest,
    /// Σ |x|
    Norm1,
    /// √(Σ x²)
    Norm2,
}

impl Aggregator {
    fn identity<T: FloatScalar>(self) -> T {
        match self {
            Aggregator::Product => T::one(),
            Aggregator::Smallest => T::infinity(),
            _ => T::zero(),
        }
    }

    #[inline]
    fn accumulate<T: FloatScalar>(self, acc: T, x: T) -> T {
        match self {
            Aggregator::Sum => acc + x,
            Aggregator::SumOfSquares | Aggregator::Norm2 => acc + x * x,
            Aggregator::Product => acc * x,
            Aggregator::Largest => acc.max(x.abs()),
            Aggregator::Smallest => {
                if x == T::zero() {
                    acc
                } else {
                    acc.min(x.abs())
                }
            }
            Aggregator::Norm1 => acc + x.abs(),
        }
    }

    fn merge<T: FloatScalar>(self, a: T, b: T) -> T {
        match self {
            Aggregator::Sum | Aggregator::SumOfSquares | Aggregator::Norm1 | Aggregator::Norm2 => a + b,
            Aggregator::Product => a * b,
            Aggregator::Largest => a.max(b),
            Aggregator::Smallest => a.min(b),
        }
    }

    fn finish<T: FloatScalar>(self, acc: T) -> T {
        match self {
            Aggregator::Norm2 => acc.sqrt(),
            Aggregator::Smallest if acc.is_infinite() => T::zero(),
            _ => acc,
        }
    }
}

fn check_shape<T>(dest: &DenseMatrix<T>, source: &(impl MatrixRef<T> + ?Sized)) -> Result<()> {
    let got = (source.nrows(), source.ncols());
    if got == dest.shape() {
        Ok(())
    } else {
        Err(Error::shape(dest.shape(), got))
    }
}

// ── Fill ────────────────────────────────────────────────────────────

impl<T: Scalar> DenseMatrix<T> {
    /// Set every element to `value`.
    pub fn fill_all(&mut self, value: T) {
        parallel::dispatch(KernelKind::Fill, 0, self.columns_mut(), &|_, mut block: Columns<'_, T>| {
            for local in 0..block.ncols() {
                block.col_mut(local).fill(value);
            }
        });
    }

    /// Set elements with linear (column-major) index in `first..limit`.
    pub fn fill_range(&mut self, first: usize, limit: usize, value: T) {
        self.data[first..limit].fill(value);
    }

    /// Copy every element from a source of the same shape.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let a = DenseMatrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
    /// let mut b = DenseMatrix::<f64>::zeros(2, 2);
    /// b.fill_matching(&a.t()).unwrap();
    /// assert_eq!(b[(0, 1)], 3.0);
    /// assert!(b.fill_matching(&DenseMatrix::<f64>::zeros(3, 2)).is_err());
    /// ```
    pub fn fill_matching(&mut self, source: &(impl MatrixRef<T> + ?Sized)) -> Result<()> {
        check_shape(self, source)?;
        crate::dense::fill_columns_from(self, source);
        Ok(())
    }

    /// Overwrite with `op(left, right)` elementwise.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let a = DenseMatrix::fill(2, 2, 3.0);
    /// let b = DenseMatrix::<f64>::identity(2);
    /// let mut c = DenseMatrix::<f64>::zeros(2, 2);
    /// c.fill_with(&a, |x, y| x * y, &b).unwrap();
    /// assert_eq!(c, DenseMatrix::from_rows(2, 2, &[3.0, 0.0, 0.0, 3.0]).unwrap());
    /// ```
    pub fn fill_with<F>(
        &mut self,
        left: &(impl MatrixRef<T> + ?Sized),
        op: F,
        right: &(impl MatrixRef<T> + ?Sized),
    ) -> Result<()>
    where
        F: Fn(T, T) -> T + Sync,
    {
        check_shape(self, left)?;
        check_shape(self, right)?;
        parallel::dispatch(KernelKind::Fill, 0, self.columns_mut(), &|first, mut block: Columns<'_, T>| {
            for local in 0..block.ncols() {
                let j = first + local;
                for (i, x) in block.col_mut(local).iter_mut().enumerate() {
                    *x = op(left.get(i, j), right.get(i, j));
                }
            }
        });
        Ok(())
    }

    // ── Modify ──────────────────────────────────────────────────────

    /// Replace every element `x` with `f(x)`.
    pub fn modify_all<F>(&mut self, f: F)
    where
        F: Fn(T) -> T + Sync,
    {
        parallel::dispatch(KernelKind::Modify, 0, self.columns_mut(), &|_, mut block: Columns<'_, T>| {
            for local in 0..block.ncols() {
                for x in block.col_mut(local) {
                    *x = f(*x);
                }
            }
        });
    }

    /// Replace every element `x` with `op(x, right)` for the matching
    /// element of `right`.
    pub fn modify_matching<F>(&mut self, op: F, right: &(impl MatrixRef<T> + ?Sized)) -> Result<()>
    where
        F: Fn(T, T) -> T + Sync,
    {
        check_shape(self, right)?;
        parallel::dispatch(KernelKind::Modify, 0, self.columns_mut(), &|first, mut block: Columns<'_, T>| {
            for local in 0..block.ncols() {
                let j = first + local;
                for (i, x) in block.col_mut(local).iter_mut().enumerate() {
                    *x = op(*x, right.get(i, j));
                }
            }
        });
        Ok(())
    }

    /// Modify column `col` from row `row` down.
    pub fn modify_column(&mut self, row: usize, col: usize, f: impl Fn(T) -> T) {
        for x in &mut self.col_mut(col)[row..] {
            *x = f(*x);
        }
    }

    /// Modify row `row` from column `col` right.
    pub fn modify_row(&mut self, row: usize, col: usize, f: impl Fn(T) -> T) {
        let n = self.nrows;
        for j in col..self.ncols {
            let x = &mut self.data[row + n * j];
            *x = f(*x);
        }
    }

    /// Modify the diagonal starting at `(row, col)` and moving down-right.
    pub fn modify_diagonal(&mut self, row: usize, col: usize, f: impl Fn(T) -> T) {
        let n = self.nrows;
        for k in 0..self.diagonal_len(row, col) {
            let x = &mut self.data[(row + k) + n * (col + k)];
            *x = f(*x);
        }
    }

    /// Replace the single element at `(row, col)` with `f` of itself.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let mut m = DenseMatrix::fill(2, 2, 3.0);
    /// m.modify_one(1, 0, |x| x * x);
    /// assert_eq!(m[(1, 0)], 9.0);
    /// assert_eq!(m[(0, 0)], 3.0);
    /// ```
    pub fn modify_one(&mut self, row: usize, col: usize, f: impl FnOnce(T) -> T) {
        let x = &mut self[(row, col)];
        *x = f(*x);
    }

    fn diagonal_len(&self, row: usize, col: usize) -> usize {
        self.nrows.saturating_sub(row).min(self.ncols.saturating_sub(col))
    }

    // ── Range-limited fills and visits ──────────────────────────────

    /// Set column `col` from row `row` down to `value`.
    pub fn fill_column(&mut self, row: usize, col: usize, value: T) {
        self.col_mut(col)[row..].fill(value);
    }

    /// Set row `row` from column `col` right to `value`.
    pub fn fill_row(&mut self, row: usize, col: usize, value: T) {
        let n = self.nrows;
        for j in col..self.ncols {
            self.data[row + n * j] = value;
        }
    }

    /// Set the diagonal starting at `(row, col)` to `value`.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let mut m = DenseMatrix::<f64>::zeros(3, 4);
    /// m.fill_diagonal(0, 1, 7.0);
    /// assert_eq!([m[(0, 1)], m[(1, 2)], m[(2, 3)]], [7.0; 3]);
    /// assert_eq!(m[(0, 0)], 0.0);
    /// ```
    pub fn fill_diagonal(&mut self, row: usize, col: usize, value: T) {
        let n = self.nrows;
        for k in 0..self.diagonal_len(row, col) {
            self.data[(row + k) + n * (col + k)] = value;
        }
    }

    /// Feed column `col` from row `row` down to `visitor`, top to bottom.
    pub fn visit_column(&self, row: usize, col: usize, mut visitor: impl FnMut(T)) {
        self.col(col)[row..].iter().for_each(|&x| visitor(x));
    }

    /// Feed row `row` from column `col` right to `visitor`, left to right.
    pub fn visit_row(&self, row: usize, col: usize, mut visitor: impl FnMut(T)) {
        let n = self.nrows;
        for j in col..self.ncols {
            visitor(self.data[row + n * j]);
        }
    }

    /// Feed the diagonal starting at `(row, col)` to `visitor`.
    pub fn visit_diagonal(&self, row: usize, col: usize, mut visitor: impl FnMut(T)) {
        let n = self.nrows;
        for k in 0..self.diagonal_len(row, col) {
            visitor(self.data[(row + k) + n * (col + k)]);
        }
    }

    // ── axpy ────────────────────────────────────────────────────────

    /// Column axpy: `self[first_row.., col_y] += a * self[first_row.., col_x]`.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let mut m = DenseMatrix::from_rows(3, 2, &[1.0, 10.0, 2.0, 20.0, 3.0, 30.0]).unwrap();
    /// m.caxpy(2.0, 0, 1, 1).unwrap();
    /// assert_eq!(m.col(1), &[10.0, 24.0, 36.0]);
    /// ```
    pub fn caxpy(&mut self, a: T, col_x: usize, col_y: usize, first_row: usize) -> Result<()> {
        let n = self.nrows;
        self.check_col(col_x.max(col_y))?;
        if col_x == col_y {
            for y in &mut self.col_mut(col_y)[first_row..] {
                *y = *y + a * *y;
            }
            return Ok(());
        }
        let (x, y) = if col_x < col_y {
            let (lo, hi) = self.data.split_at_mut(col_y * n);
            (&lo[col_x * n..(col_x + 1) * n], &mut hi[..n])
        } else {
            let (lo, hi) = self.data.split_at_mut(col_x * n);
            (&hi[..n], &mut lo[col_y * n..(col_y + 1) * n])
        };
        for (yi, xi) in y[first_row..].iter_mut().zip(&x[first_row..]) {
            *yi = *yi + a * *xi;
        }
        Ok(())
    }

    /// Row axpy: `self[row_y, first_col..] += a * self[row_x, first_col..]`.
    pub fn raxpy(&mut self, a: T, row_x: usize, row_y: usize, first_col: usize) -> Result<()> {
        let n = self.nrows;
        if row_x.max(row_y) >= n {
            return Err(Error::OutOfRange {
                row: row_x.max(row_y),
                col: first_col,
                rows: self.nrows,
                cols: self.ncols,
            });
        }
        for j in first_col..self.ncols {
            let x = self.data[row_x + n * j];
            let y = &mut self.data[row_y + n * j];
            *y = *y + a * x;
        }
        Ok(())
    }

    /// Matrix axpy: `self += a * x` elementwise, parallel over columns.
    pub fn maxpy(&mut self, a: T, x: &(impl MatrixRef<T> + ?Sized)) -> Result<()> {
        self.modify_matching(|y, xi| y + a * xi, x)
    }

    fn check_col(&self, col: usize) -> Result<()> {
        if col < self.ncols {
            Ok(())
        } else {
            Err(Error::OutOfRange {
                row: 0,
                col,
                rows: self.nrows,
                cols: self.ncols,
            })
        }
    }
}

// ── Reduce ──────────────────────────────────────────────────────────

impl<T: FloatScalar> DenseMatrix<T> {
    /// Reduce every element with `aggregator`.
    ///
    /// ```
    /// use densestore::{Aggregator, DenseMatrix};
    /// let m = DenseMatrix::from_rows(2, 2, &[1.0, -2.0, 0.0, 4.0]).unwrap();
    /// assert_eq!(m.aggregate_all(Aggregator::Sum), 3.0);
    /// assert_eq!(m.aggregate_all(Aggregator::Largest), 4.0);
    /// assert_eq!(m.aggregate_all(Aggregator::Smallest), 1.0);
    /// assert_eq!(m.aggregate_all(Aggregator::Norm1), 7.0);
    /// ```
    pub fn aggregate_all(&self, aggregator: Aggregator) -> T {
        let nrows = self.nrows;
        let acc = parallel::reduce(
            KernelKind::Aggregate,
            0..self.ncols,
            aggregator.identity(),
            |cols| {
                self.data[cols.start * nrows..cols.end * nrows]
                    .iter()
                    .fold(aggregator.identity(), |acc, &x| aggregator.accumulate(acc, x))
            },
            |a, b| aggregator.merge(a, b),
        );
        aggregator.finish(acc)
    }

    /// [`Aggregator`] over column `col` from row `row` down.
    ///
    /// ```
    /// use densestore::{Aggregator, DenseMatrix};
    /// let m = DenseMatrix::from_rows(3, 1, &[9.0, -2.0, 4.0]).unwrap();
    /// assert_eq!(m.aggregate_column(1, 0, Aggregator::Sum), 2.0);
    /// assert_eq!(m.aggregate_column(0, 0, Aggregator::Largest), 9.0);
    /// ```
    pub fn aggregate_column(&self, row: usize, col: usize, aggregator: Aggregator) -> T {
        let mut acc = aggregator.identity();
        self.visit_column(row, col, |x| acc = aggregator.accumulate(acc, x));
        aggregator.finish(acc)
    }

    /// [`Aggregator`] over row `row` from column `col` right.
    pub fn aggregate_row(&self, row: usize, col: usize, aggregator: Aggregator) -> T {
        let mut acc = aggregator.identity();
        self.visit_row(row, col, |x| acc = aggregator.accumulate(acc, x));
        aggregator.finish(acc)
    }

    /// [`Aggregator`] over the diagonal starting at `(row, col)`.
    pub fn aggregate_diagonal(&self, row: usize, col: usize, aggregator: Aggregator) -> T {
        let mut acc = aggregator.identity();
        self.visit_diagonal(row, col, |x| acc = aggregator.accumulate(acc, x));
        aggregator.finish(acc)
    }
}
