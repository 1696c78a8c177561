use core::fmt;

use crate::kernels::Aggregator;
use crate::parallel::{self, KernelKind};
use crate::traits::{FloatScalar, Scalar};

use super::DenseMatrix;

impl<T> DenseMatrix<T> {
    /// Apply `f` to every element, producing a new matrix (possibly of a
    /// different element type).
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let m = DenseMatrix::from_rows(2, 2, &[1.0_f64, 2.0, 3.0, 4.0]).unwrap();
    /// let doubled = m.map(|x| x * 2.0);
    /// assert_eq!(doubled[(1, 1)], 8.0);
    /// ```
    pub fn map<U>(&self, f: impl Fn(T) -> U) -> DenseMatrix<U>
    where
        T: Copy,
    {
        DenseMatrix {
            data: self.data.iter().map(|&x| f(x)).collect(),
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }
}

// ── Norms ───────────────────────────────────────────────────────────

impl<T: FloatScalar> DenseMatrix<T> {
    /// Maximum absolute column sum.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let m = DenseMatrix::from_rows(2, 2, &[1.0_f64, -2.0, 3.0, 4.0]).unwrap();
    /// assert_eq!(m.norm_one(), 6.0);
    /// ```
    pub fn norm_one(&self) -> T {
        let nrows = self.nrows;
        parallel::reduce(
            KernelKind::Aggregate,
            0..self.ncols,
            T::zero(),
            |cols| {
                let mut best = T::zero();
                for j in cols {
                    let s = self.data[j * nrows..(j + 1) * nrows]
                        .iter()
                        .fold(T::zero(), |acc, x| acc + x.abs());
                    best = best.max(s);
                }
                best
            },
            T::max,
        )
    }

    /// Maximum absolute row sum.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let m = DenseMatrix::from_rows(2, 2, &[1.0_f64, -2.0, 3.0, 4.0]).unwrap();
    /// assert_eq!(m.norm_inf(), 7.0);
    /// ```
    pub fn norm_inf(&self) -> T {
        let mut sums = vec![T::zero(); self.nrows];
        for j in 0..self.ncols {
            for (s, x) in sums.iter_mut().zip(self.col(j)) {
                *s = *s + x.abs();
            }
        }
        sums.into_iter().fold(T::zero(), T::max)
    }

    /// Frobenius norm: square root of the sum of squared elements.
    pub fn norm_frobenius(&self) -> T {
        self.aggregate_all(Aggregator::Norm2)
    }

    /// Largest absolute element.
    pub fn max_abs(&self) -> T {
        self.aggregate_all(Aggregator::Largest)
    }

    /// Whether every entry below the first sub-diagonal has magnitude at
    /// most `tol`.
    pub fn is_upper_hessenberg(&self, tol: T) -> bool {
        (0..self.ncols).all(|j| {
            let start = (j + 2).min(self.nrows);
            self.col(j)[start..].iter().all(|x| x.abs() <= tol)
        })
    }

    /// Whether the matrix is square and exactly the identity.
    pub fn is_identity(&self) -> bool {
        self.is_square()
            && (0..self.ncols).all(|j| {
                self.col(j).iter().enumerate().all(|(i, &x)| {
                    if i == j {
                        x == T::one()
                    } else {
                        x == T::zero()
                    }
                })
            })
    }

    /// Same shape and every element within `tol` of the other's.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let a = DenseMatrix::<f64>::identity(2);
    /// let b = DenseMatrix::from_rows(2, 2, &[1.0, 1e-12, 0.0, 1.0]).unwrap();
    /// assert!(a.approx_eq(&b, 1e-10));
    /// assert!(!a.approx_eq(&b, 1e-14));
    /// ```
    pub fn approx_eq(&self, other: &Self, tol: T) -> bool {
        self.shape() == other.shape()
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| (*a - *b).abs() <= tol)
    }
}

impl<T: Scalar> DenseMatrix<T> {
    /// Sum of the diagonal.
    pub fn trace(&self) -> T {
        (0..self.nrows.min(self.ncols)).fold(T::zero(), |acc, i| acc + self[(i, i)])
    }
}

// ── Display ─────────────────────────────────────────────────────────

impl<T: fmt::Display> fmt::Display for DenseMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<String> = self.data.iter().map(|x| x.to_string()).collect();
        let widths: Vec<usize> = (0..self.ncols)
            .map(|j| {
                cells[j * self.nrows..(j + 1) * self.nrows]
                    .iter()
                    .map(String::len)
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        for i in 0..self.nrows {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "│")?;
            for (j, width) in widths.iter().enumerate() {
                if j > 0 {
                    write!(f, "  ")?;
                }
                write!(f, "{:>width$}", cells[i + j * self.nrows])?;
            }
            write!(f, "│")?;
        }
        Ok(())
    }
}
