//! Column elimination and triangular substitution kernels.
//!
//! These are the building blocks LU and Cholesky factorizations call once
//! per pivot. They mutate the trailing columns in place and are parallel
//! over columns.

use crate::dense::DenseMatrix;
use crate::error::{Error, Result};
use crate::parallel::{self, Columns, KernelKind};
use crate::traits::{FloatScalar, MatrixMut, MatrixRef, Scalar};

impl<T: Scalar> DenseMatrix<T> {
    fn check_multipliers(&self, multipliers: &[T]) -> Result<()> {
        if multipliers.len() == self.nrows {
            Ok(())
        } else {
            Err(Error::shape((self.nrows, 1), (multipliers.len(), 1)))
        }
    }

    fn check_pivot(&self, pivot: usize) -> Result<()> {
        if pivot < self.nrows.min(self.ncols) {
            Ok(())
        } else {
            Err(Error::OutOfRange {
                row: pivot,
                col: pivot,
                rows: self.nrows,
                cols: self.ncols,
            })
        }
    }

    /// One LU elimination step.
    ///
    /// For every column `j > pivot`, subtracts `self[pivot, j]` times the
    /// multiplier column from rows `pivot+1..`. `multipliers` has one entry
    /// per row; entries at or above `pivot` are ignored.
    pub fn apply_lu(&mut self, pivot: usize, multipliers: &[T]) -> Result<()> {
        self.check_pivot(pivot)?;
        self.check_multipliers(multipliers)?;
        let below = &multipliers[pivot + 1..];
        parallel::dispatch(
            KernelKind::Elimination,
            pivot + 1,
            self.columns_from_mut(pivot + 1),
            &|_, mut block: Columns<'_, T>| {
                for local in 0..block.ncols() {
                    let col = block.col_mut(local);
                    let a = col[pivot];
                    for (x, &m) in col[pivot + 1..].iter_mut().zip(below) {
                        *x = *x - a * m;
                    }
                }
            },
        );
        Ok(())
    }

    /// One Cholesky elimination step.
    ///
    /// For every column `j > pivot`, subtracts `multipliers[j]` times the
    /// multiplier column from rows `j..`, updating only the lower triangle.
    pub fn apply_cholesky(&mut self, pivot: usize, multipliers: &[T]) -> Result<()> {
        self.check_pivot(pivot)?;
        self.check_multipliers(multipliers)?;
        parallel::dispatch(
            KernelKind::Elimination,
            pivot + 1,
            self.columns_from_mut(pivot + 1),
            &|first, mut block: Columns<'_, T>| {
                for local in 0..block.ncols() {
                    let j = first + local;
                    let a = multipliers[j];
                    let col = block.col_mut(local);
                    for (x, &m) in col[j..].iter_mut().zip(&multipliers[j..]) {
                        *x = *x - a * m;
                    }
                }
            },
        );
        Ok(())
    }

    /// Divide column `col` below `row` by the pivot `self[row, col]`,
    /// writing the quotients back and copying them into the same rows of
    /// `destination`.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let mut m = DenseMatrix::from_rows(3, 1, &[2.0, 4.0, -6.0]).unwrap();
    /// let mut l = vec![0.0; 3];
    /// m.divide_and_copy_column(0, 0, &mut l).unwrap();
    /// assert_eq!(m.col(0), &[2.0, 2.0, -3.0]);
    /// assert_eq!(l, vec![0.0, 2.0, -3.0]);
    /// ```
    pub fn divide_and_copy_column(&mut self, row: usize, col: usize, destination: &mut [T]) -> Result<()> {
        if row >= self.nrows || col >= self.ncols {
            return Err(Error::OutOfRange {
                row,
                col,
                rows: self.nrows,
                cols: self.ncols,
            });
        }
        self.check_multipliers(destination)?;
        let (pivot, below) = match self.col_as_mut_slice(col, row) {
            [pivot, below @ ..] => (*pivot, below),
            [] => return Ok(()),
        };
        for (x, d) in below.iter_mut().zip(&mut destination[row + 1..]) {
            *x = *x / pivot;
            *d = *x;
        }
        Ok(())
    }

    fn check_body(&self, body: &(impl MatrixRef<T> + ?Sized)) -> Result<()> {
        let got = (body.nrows(), body.ncols());
        if got == (self.nrows, self.nrows) {
            Ok(())
        } else {
            Err(Error::shape((self.nrows, self.nrows), got))
        }
    }

    /// Solve `L · X = self` in place, `L` the lower triangle of `body`.
    ///
    /// With `unit_diagonal` the diagonal of `body` is taken as ones. With
    /// `zeros_above_diagonal` the right-hand side is known to be zero above
    /// its diagonal (e.g. an identity), so each column starts at its
    /// diagonal.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let l = DenseMatrix::from_rows(2, 2, &[2.0, 0.0, 1.0, 4.0]).unwrap();
    /// let mut x = DenseMatrix::from_rows(2, 1, &[4.0, 10.0]).unwrap();
    /// x.substitute_forwards(&l, false, false).unwrap();
    /// assert_eq!(x.col(0), &[2.0, 2.0]);
    /// ```
    pub fn substitute_forwards(
        &mut self,
        body: &(impl MatrixRef<T> + ?Sized),
        unit_diagonal: bool,
        zeros_above_diagonal: bool,
    ) -> Result<()> {
        self.check_body(body)?;
        let dim = self.nrows;
        parallel::dispatch(KernelKind::Substitution, 0, self.columns_mut(), &|first, mut block: Columns<'_, T>| {
            for local in 0..block.ncols() {
                let j = first + local;
                let start = if zeros_above_diagonal { j.min(dim) } else { 0 };
                let x = block.col_mut(local);
                for i in start..dim {
                    let mut acc = T::zero();
                    for k in start..i {
                        acc = acc + body.get(i, k) * x[k];
                    }
                    x[i] = if unit_diagonal {
                        x[i] - acc
                    } else {
                        (x[i] - acc) / body.get(i, i)
                    };
                }
            }
        });
        Ok(())
    }

    /// Solve `U · X = self` in place, `U` the upper triangle of `body`, or
    /// `Uᵀ · X = self` when `transposed` (reading the lower triangle of
    /// `body` as `Uᵀ`'s transpose).
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let u = DenseMatrix::from_rows(2, 2, &[2.0, 1.0, 0.0, 4.0]).unwrap();
    /// let mut x = DenseMatrix::from_rows(2, 1, &[4.0, 8.0]).unwrap();
    /// x.substitute_backwards(&u, false).unwrap();
    /// assert_eq!(x.col(0), &[1.0, 2.0]);
    /// ```
    pub fn substitute_backwards(&mut self, body: &(impl MatrixRef<T> + ?Sized), transposed: bool) -> Result<()> {
        self.check_body(body)?;
        let dim = self.nrows;
        parallel::dispatch(KernelKind::Substitution, 0, self.columns_mut(), &|_, mut block: Columns<'_, T>| {
            for local in 0..block.ncols() {
                let x = block.col_mut(local);
                for i in (0..dim).rev() {
                    let mut acc = T::zero();
                    for k in i + 1..dim {
                        let b = if transposed { body.get(k, i) } else { body.get(i, k) };
                        acc = acc + b * x[k];
                    }
                    x[i] = (x[i] - acc) / body.get(i, i);
                }
            }
        });
        Ok(())
    }
}

impl<T: FloatScalar> DenseMatrix<T> {
    /// Row index of the largest `|x|` in column `col` at or below `row`.
    /// Ties go to the upper row.
    ///
    /// This is the partial-pivot search an LU driver runs before each
    /// [`apply_lu`](Self::apply_lu).
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let m = DenseMatrix::from_rows(4, 1, &[9.0, 1.0, -5.0, 5.0]).unwrap();
    /// assert_eq!(m.index_of_largest_in_column(0, 0), Ok(0));
    /// assert_eq!(m.index_of_largest_in_column(1, 0), Ok(2));
    /// ```
    pub fn index_of_largest_in_column(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.nrows || col >= self.ncols {
            return Err(Error::OutOfRange {
                row,
                col,
                rows: self.nrows,
                cols: self.ncols,
            });
        }
        let (mut best, mut largest) = (row, self[(row, col)].abs());
        for (i, x) in self.col_as_slice(col, row).iter().enumerate().skip(1) {
            if x.abs() > largest {
                best = row + i;
                largest = x.abs();
            }
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::{with_thresholds, Thresholds};

    const TOL: f64 = 1e-12;

    fn spd() -> DenseMatrix<f64> {
        DenseMatrix::from_rows(
            4,
            4,
            &[
                10.0, 1.0, 2.0, 0.5, //
                1.0, 8.0, -1.0, 1.5, //
                2.0, -1.0, 9.0, 0.0, //
                0.5, 1.5, 0.0, 7.0,
            ],
        )
        .unwrap()
    }

    /// LU without pivoting, using only the elimination hooks.
    fn lu_in_place(a: &mut DenseMatrix<f64>) {
        let n = a.nrows();
        let mut multipliers = vec![0.0; n];
        for p in 0..n - 1 {
            a.divide_and_copy_column(p, p, &mut multipliers).unwrap();
            a.apply_lu(p, &multipliers).unwrap();
        }
    }

    #[test]
    fn lu_steps_reconstruct() {
        let a = spd();
        let mut lu = a.clone();
        lu_in_place(&mut lu);
        let l = DenseMatrix::from_fn(4, 4, |i, j| match i.cmp(&j) {
            core::cmp::Ordering::Greater => lu[(i, j)],
            core::cmp::Ordering::Equal => 1.0,
            core::cmp::Ordering::Less => 0.0,
        });
        let u = DenseMatrix::from_fn(4, 4, |i, j| if i <= j { lu[(i, j)] } else { 0.0 });
        assert!((&l * &u).approx_eq(&a, TOL));
    }

    #[test]
    fn cholesky_steps_reconstruct() {
        let a = spd();
        let mut c = a.clone();
        let n = 4;
        let mut multipliers = vec![0.0; n];
        for p in 0..n {
            let d = c[(p, p)].sqrt();
            c[(p, p)] = d;
            c.divide_and_copy_column(p, p, &mut multipliers).unwrap();
            if p + 1 < n {
                c.apply_cholesky(p, &multipliers).unwrap();
            }
        }
        let l = DenseMatrix::from_fn(4, 4, |i, j| if i >= j { c[(i, j)] } else { 0.0 });
        assert!((&l * &l.transpose()).approx_eq(&a, TOL));
    }

    #[test]
    fn elimination_parallel_bit_identical() {
        let base = DenseMatrix::from_fn(6, 40, |i, j| 1.0 + ((i * 5 + j * 3) % 7) as f64 / 3.0);
        let multipliers: Vec<f64> = (0..6).map(|i| 0.5 - i as f64 * 0.1).collect();
        let mut serial = base.clone();
        with_thresholds(Thresholds::serial(), || serial.apply_lu(1, &multipliers).unwrap());
        let mut eager = base.clone();
        with_thresholds(Thresholds::eager(), || eager.apply_lu(1, &multipliers).unwrap());
        assert_eq!(serial, eager);
        assert_eq!(serial.col(0), base.col(0));
        assert_eq!(serial.col(1), base.col(1));
    }

    #[test]
    fn cholesky_parallel_bit_identical() {
        let base = DenseMatrix::from_fn(40, 40, |i, j| 2.0 + ((i * 3 + j * 7) % 9) as f64 / 4.0);
        let multipliers: Vec<f64> = (0..40).map(|i| 0.25 + (i % 5) as f64 * 0.1).collect();
        let run = |t: Thresholds| {
            let mut m = base.clone();
            with_thresholds(t, || m.apply_cholesky(2, &multipliers).unwrap());
            m
        };
        let serial = run(Thresholds::serial());
        assert_eq!(serial, run(Thresholds::eager()));
        assert_eq!(serial.col(2), base.col(2));
        // Only the lower triangle of the trailing columns moves.
        assert_eq!(serial[(3, 5)], base[(3, 5)]);
        assert_ne!(serial[(5, 5)], base[(5, 5)]);
    }

    #[test]
    fn substitution_parallel_bit_identical() {
        let mut body = spd();
        lu_in_place(&mut body);
        let rhs = DenseMatrix::from_fn(4, 33, |i, j| (i as f64 - 1.5) * (j as f64 * 0.25 + 1.0));
        let run = |t: Thresholds| {
            with_thresholds(t, || {
                let mut forwards = rhs.clone();
                forwards.substitute_forwards(&body, true, false).unwrap();
                let mut identity_rhs = DenseMatrix::eye(4, 33);
                identity_rhs.substitute_forwards(&body, false, true).unwrap();
                let mut backwards = rhs.clone();
                backwards.substitute_backwards(&body, false).unwrap();
                let mut transposed = rhs.clone();
                transposed.substitute_backwards(&body, true).unwrap();
                (forwards, identity_rhs, backwards, transposed)
            })
        };
        assert_eq!(run(Thresholds::serial()), run(Thresholds::eager()));
    }

    #[test]
    fn largest_in_column() {
        let m = DenseMatrix::from_rows(4, 2, &[1.0, 0.0, -7.0, 0.0, 7.0, 0.0, 3.0, 0.0]).unwrap();
        assert_eq!(m.index_of_largest_in_column(0, 0), Ok(1));
        assert_eq!(m.index_of_largest_in_column(2, 0), Ok(2));
        assert_eq!(m.index_of_largest_in_column(3, 0), Ok(3));
        assert_eq!(m.index_of_largest_in_column(1, 1), Ok(1));
        assert!(m.index_of_largest_in_column(4, 0).is_err());
        assert!(m.index_of_largest_in_column(0, 2).is_err());
    }

    #[test]
    fn multiplier_length_checked() {
        let mut a = spd();
        assert_eq!(a.apply_lu(0, &[1.0, 2.0]).unwrap_err(), Error::shape((4, 1), (2, 1)));
        assert!(a.apply_cholesky(4, &[0.0; 4]).is_err());
        assert_eq!(a, spd());
    }

    #[test]
    fn forwards_and_backwards_invert() {
        let a = spd();
        let mut lu = a.clone();
        lu_in_place(&mut lu);

        // A⁻¹ = U⁻¹ L⁻¹ I
        let mut inv = DenseMatrix::identity(4);
        inv.substitute_forwards(&lu, true, true).unwrap();
        inv.substitute_backwards(&lu, false).unwrap();
        assert!((&a * &inv).approx_eq(&DenseMatrix::identity(4), 1e-12));
    }

    #[test]
    fn backwards_transposed() {
        // Lᵀ x = b with L lower triangular.
        let l = DenseMatrix::from_rows(2, 2, &[2.0, 0.0, 1.0, 4.0]).unwrap();
        let mut x = DenseMatrix::from_rows(2, 1, &[5.0, 8.0]).unwrap();
        x.substitute_backwards(&l, true).unwrap();
        // [2 1; 0 4] x = [5; 8] → x = [1.5, 2]
        assert_eq!(x.col(0), &[1.5, 2.0]);
    }

    #[test]
    fn substitution_shape_checked() {
        let mut x = DenseMatrix::<f64>::zeros(3, 1);
        let body = DenseMatrix::<f64>::identity(2);
        assert!(x.substitute_forwards(&body, false, false).is_err());
        assert!(x.substitute_backwards(&body, false).is_err());
    }
}
