//! Dense products, parallel over product columns.
//!
//! Three paths, picked by which operand has dense storage:
//!
//! - right dense: each product column is a set of dot products of left
//!   rows with one contiguous right column;
//! - left dense (right a view): each product column is built by axpy over
//!   contiguous left columns;
//! - neither dense: dot products through `MatrixRef::get`.
//!
//! Every element is accumulated from zero as `acc + l[i,k] * r[k,j]` for
//! `k = 0..inner` in increasing order on every path, so the paths agree
//! with each other and with serial execution bit for bit.

use crate::dense::{DenseMatrix, Operand};
use crate::error::{Error, Result};
use crate::parallel::{self, Columns, KernelKind};
use crate::traits::{MatrixRef, Scalar};

fn product_dense_right<T: Scalar>(product: Columns<'_, T>, first: usize, left: &Operand<'_, T>, right: &DenseMatrix<T>) {
    let mut product = product;
    for local in 0..product.ncols() {
        let r = right.col(first + local);
        for (i, out) in product.col_mut(local).iter_mut().enumerate() {
            let mut acc = T::zero();
            for (k, &rk) in r.iter().enumerate() {
                acc = acc + left.get(i, k) * rk;
            }
            *out = acc;
        }
    }
}

fn product_dense_left<T: Scalar>(product: Columns<'_, T>, first: usize, left: &DenseMatrix<T>, right: &dyn MatrixRef<T>) {
    let mut product = product;
    for local in 0..product.ncols() {
        let j = first + local;
        let out = product.col_mut(local);
        out.fill(T::zero());
        for k in 0..left.ncols() {
            let rkj = right.get(k, j);
            for (o, &lik) in out.iter_mut().zip(left.col(k)) {
                *o = *o + lik * rkj;
            }
        }
    }
}

fn product_general<T: Scalar>(product: Columns<'_, T>, first: usize, left: &dyn MatrixRef<T>, right: &dyn MatrixRef<T>) {
    let mut product = product;
    let inner = left.ncols();
    for local in 0..product.ncols() {
        let j = first + local;
        for (i, out) in product.col_mut(local).iter_mut().enumerate() {
            let mut acc = T::zero();
            for k in 0..inner {
                acc = acc + left.get(i, k) * right.get(k, j);
            }
            *out = acc;
        }
    }
}

impl<T: Scalar> DenseMatrix<T> {
    /// Overwrite `self` with `left · right`.
    ///
    /// Fails with [`Error::ShapeMismatch`] before writing anything if the
    /// inner dimensions disagree or `self` is not `left.nrows() x right.ncols()`.
    ///
    /// ```
    /// use densestore::{DenseMatrix, Operand};
    /// let a = DenseMatrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    /// let at = a.t();
    /// let mut gram = DenseMatrix::<f64>::zeros(2, 2);
    /// gram.fill_by_multiplying(Operand::from(&a), Operand::view(&at)).unwrap();
    /// assert_eq!(gram, DenseMatrix::from_rows(2, 2, &[14.0, 32.0, 32.0, 77.0]).unwrap());
    /// ```
    pub fn fill_by_multiplying(&mut self, left: Operand<'_, T>, right: Operand<'_, T>) -> Result<()> {
        if left.ncols() != right.nrows() {
            return Err(Error::shape((left.ncols(), right.ncols()), (right.nrows(), right.ncols())));
        }
        let expected = (left.nrows(), right.ncols());
        if self.shape() != expected {
            return Err(Error::shape(expected, self.shape()));
        }

        match (left, right) {
            (_, Operand::Dense(r)) => {
                parallel::dispatch(KernelKind::Multiply, 0, self.columns_mut(), &|first, block| {
                    product_dense_right(block, first, &left, r)
                });
            }
            (Operand::Dense(l), Operand::View(r)) => {
                parallel::dispatch(KernelKind::Multiply, 0, self.columns_mut(), &|first, block| {
                    product_dense_left(block, first, l, r)
                });
            }
            (Operand::View(l), Operand::View(r)) => {
                parallel::dispatch(KernelKind::Multiply, 0, self.columns_mut(), &|first, block| {
                    product_general(block, first, l, r)
                });
            }
        }
        Ok(())
    }

    /// `self · rhs` as a new matrix.
    ///
    /// ```
    /// use densestore::{DenseMatrix, Error};
    /// let a = DenseMatrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
    /// let b = DenseMatrix::from_rows(2, 1, &[1.0, -1.0]).unwrap();
    /// assert_eq!(a.multiply(&b).unwrap().as_slice(), &[-1.0, -1.0]);
    /// assert!(matches!(b.multiply(&a), Err(Error::ShapeMismatch { .. })));
    /// ```
    pub fn multiply(&self, rhs: &Self) -> Result<Self> {
        self.multiply_right(rhs)
    }

    /// `self · right` for any matrix-like right operand.
    pub fn multiply_right(&self, right: &dyn MatrixRef<T>) -> Result<Self> {
        let mut product = Self::zeros(self.nrows, right.ncols());
        product.fill_by_multiplying(Operand::Dense(self), Operand::View(right))?;
        Ok(product)
    }

    /// `left · self` for any matrix-like left operand.
    pub fn multiply_left(&self, left: &dyn MatrixRef<T>) -> Result<Self> {
        let mut product = Self::zeros(left.nrows(), self.ncols);
        product.fill_by_multiplying(Operand::View(left), Operand::Dense(self))?;
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::{with_thresholds, Thresholds};
    use rand::{rngs::StdRng, SeedableRng};
    use rand_distr::Uniform;

    fn random(rows: usize, cols: usize, seed: u64) -> DenseMatrix<f64> {
        let dist = Uniform::new(-1.0, 1.0).unwrap();
        DenseMatrix::random(rows, cols, &dist, &mut StdRng::seed_from_u64(seed))
    }

    fn naive(a: &DenseMatrix<f64>, b: &DenseMatrix<f64>) -> DenseMatrix<f64> {
        DenseMatrix::from_fn(a.nrows(), b.ncols(), |i, j| {
            let mut acc = 0.0;
            for k in 0..a.ncols() {
                acc += a[(i, k)] * b[(k, j)];
            }
            acc
        })
    }

    #[test]
    fn all_paths_bit_identical() {
        let a = random(7, 5, 1);
        let b = random(5, 9, 2);
        let expected = naive(&a, &b);
        let a_view = DenseMatrix::copy_from(&a.t());
        let b_view = DenseMatrix::copy_from(&b.t());
        let at = a_view.t();
        let bt = b_view.t();

        let mut p = DenseMatrix::zeros(7, 9);
        p.fill_by_multiplying(Operand::Dense(&a), Operand::Dense(&b)).unwrap();
        assert_eq!(p, expected, "dense x dense");
        p.fill_by_multiplying(Operand::View(&at), Operand::Dense(&b)).unwrap();
        assert_eq!(p, expected, "view x dense");
        p.fill_by_multiplying(Operand::Dense(&a), Operand::View(&bt)).unwrap();
        assert_eq!(p, expected, "dense x view");
        p.fill_by_multiplying(Operand::View(&at), Operand::View(&bt)).unwrap();
        assert_eq!(p, expected, "view x view");
    }

    #[test]
    fn parallel_bit_identical() {
        let a = random(16, 12, 3);
        let b = random(12, 70, 4);
        let serial = with_thresholds(Thresholds::serial(), || a.multiply(&b).unwrap());
        let eager = with_thresholds(Thresholds::eager(), || a.multiply(&b).unwrap());
        assert_eq!(serial, eager);
        let left = with_thresholds(Thresholds::eager(), || b.multiply_left(&a).unwrap());
        assert_eq!(serial, left);
    }

    #[test]
    fn shape_errors_leave_product_untouched() {
        let a = random(3, 4, 5);
        let b = random(3, 4, 6);
        let mut p = DenseMatrix::fill(3, 4, 9.0);
        let err = p.fill_by_multiplying(Operand::Dense(&a), Operand::Dense(&b)).unwrap_err();
        assert_eq!(err, Error::shape((4, 4), (3, 4)));
        let bt = b.transpose();
        let err = p.fill_by_multiplying(Operand::Dense(&a), Operand::Dense(&bt)).unwrap_err();
        assert_eq!(err, Error::shape((3, 3), (3, 4)));
        assert!(p.as_slice().iter().all(|&x| x == 9.0));
    }

    #[test]
    fn empty_inner_dimension() {
        let a = DenseMatrix::<f64>::zeros(3, 0);
        let b = DenseMatrix::<f64>::zeros(0, 2);
        let p = a.multiply(&b).unwrap();
        assert_eq!(p, DenseMatrix::zeros(3, 2));
    }
}
