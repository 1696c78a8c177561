use num_complex::Complex;

use super::eigenvectors::back_substitute;
use super::hessenberg::hessenberg;
use super::schur::{reduce_to_schur, SchurOptions};
use crate::dense::DenseMatrix;
use crate::error::{Error, Result};
use crate::traits::FloatScalar;

/// Eigendecomposition of a general real square matrix.
///
/// Owns copies of the real Schur form `S`, the orthogonal Schur vectors `Q`
/// (`A = Q·S·Qᵀ`), the eigenvalues, and optionally the eigenvectors.
///
/// Eigenvectors are packed into a real matrix: column `i` holds the vector
/// of a real eigenvalue at slot `i`; a complex pair at slots `(i, i+1)`
/// stores the real and imaginary parts of slot `i`'s vector in columns `i`
/// and `i+1`. [`eigenvector`](Self::eigenvector) unpacks either case.
///
/// ```
/// use densestore::{DenseEigen, DenseMatrix};
///
/// let a = DenseMatrix::from_rows(2, 2, &[2.0, 1.0, 1.0, 2.0]).unwrap();
/// let eig = DenseEigen::new(&a).unwrap();
/// let mut re: Vec<f64> = eig.eigenvalues().iter().map(|c| c.re).collect();
/// re.sort_by(|a, b| a.partial_cmp(b).unwrap());
/// assert!((re[0] - 1.0).abs() < 1e-12);
/// assert!((re[1] - 3.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct DenseEigen<T> {
    schur: DenseMatrix<T>,
    schur_vectors: DenseMatrix<T>,
    eigenvectors: Option<DenseMatrix<T>>,
    values: Vec<Complex<T>>,
}

impl<T: FloatScalar> DenseEigen<T> {
    /// Eigenvalues and eigenvectors of `a`.
    pub fn new(a: &DenseMatrix<T>) -> Result<Self> {
        Self::with_options(a, true, &SchurOptions::for_order(a.nrows()))
    }

    /// Eigenvalues and Schur decomposition of `a`, without eigenvectors.
    pub fn values_only(a: &DenseMatrix<T>) -> Result<Self> {
        Self::with_options(a, false, &SchurOptions::for_order(a.nrows()))
    }

    pub fn with_options(a: &DenseMatrix<T>, want_eigenvectors: bool, options: &SchurOptions) -> Result<Self> {
        if !a.is_square() {
            return Err(Error::NotSquare {
                rows: a.nrows(),
                cols: a.ncols(),
            });
        }
        let n = a.nrows();
        let mut schur = a.clone();
        let mut schur_vectors = DenseMatrix::identity(n);
        hessenberg(&mut schur, &mut schur_vectors)?;
        let spectrum = reduce_to_schur(&mut schur, &mut schur_vectors, options)?;

        let eigenvectors = if want_eigenvectors {
            let mut basis = schur.clone();
            let mut vectors = schur_vectors.clone();
            if spectrum.norm1 != T::zero() {
                back_substitute(&mut basis, &mut vectors, &spectrum)?;
            }
            Some(vectors)
        } else {
            None
        };

        Ok(Self {
            schur,
            schur_vectors,
            eigenvectors,
            values: spectrum.values(),
        })
    }

    /// Order of the decomposed matrix.
    #[inline]
    pub fn order(&self) -> usize {
        self.values.len()
    }

    /// Eigenvalues in diagonal order of the Schur form.
    #[inline]
    pub fn eigenvalues(&self) -> &[Complex<T>] {
        &self.values
    }

    /// The quasi-upper-triangular real Schur form `S`.
    #[inline]
    pub fn schur_form(&self) -> &DenseMatrix<T> {
        &self.schur
    }

    /// The orthogonal Schur vectors `Q`.
    #[inline]
    pub fn schur_vectors(&self) -> &DenseMatrix<T> {
        &self.schur_vectors
    }

    /// The packed eigenvector matrix, if it was computed.
    #[inline]
    pub fn eigenvectors(&self) -> Option<&DenseMatrix<T>> {
        self.eigenvectors.as_ref()
    }

    /// Whether every eigenvalue is real.
    pub fn is_real(&self) -> bool {
        self.values.iter().all(|c| c.im == T::zero())
    }

    /// The (unnormalised) eigenvector for slot `i`, or `None` when
    /// eigenvectors were not computed or `i` is out of range.
    ///
    /// ```
    /// use densestore::{Complex, DenseMatrix};
    ///
    /// let a = DenseMatrix::from_rows(2, 2, &[0.0, -1.0, 1.0, 0.0]).unwrap();
    /// let eig = a.eigen().unwrap();
    /// let v = eig.eigenvector(0).unwrap();
    /// // A·v = i·v
    /// let av0 = v[0] * a[(0, 0)] + v[1] * a[(0, 1)];
    /// assert!((av0 - Complex::new(0.0, 1.0) * v[0]).norm() < 1e-12);
    /// ```
    pub fn eigenvector(&self, i: usize) -> Option<Vec<Complex<T>>> {
        let vectors = self.eigenvectors.as_ref()?;
        let value = *self.values.get(i)?;
        let vector = if value.im == T::zero() {
            vectors.col(i).iter().map(|&x| Complex::new(x, T::zero())).collect()
        } else if value.im > T::zero() {
            let (re, im) = (vectors.col(i), vectors.col(i + 1));
            re.iter().zip(im).map(|(&a, &b)| Complex::new(a, b)).collect()
        } else {
            let (re, im) = (vectors.col(i - 1), vectors.col(i));
            re.iter().zip(im).map(|(&a, &b)| Complex::new(a, -b)).collect()
        };
        Some(vector)
    }
}

impl<T: FloatScalar> DenseMatrix<T> {
    /// Eigendecomposition of a copy of this matrix, with eigenvectors.
    pub fn eigen(&self) -> Result<DenseEigen<T>> {
        DenseEigen::new(self)
    }

    /// Eigenvalues of a copy of this matrix.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let values = DenseMatrix::<f64>::identity(3).eigenvalues().unwrap();
    /// assert!(values.iter().all(|c| c.re == 1.0 && c.im == 0.0));
    /// ```
    pub fn eigenvalues(&self) -> Result<Vec<Complex<T>>> {
        let mut work = self.clone();
        let mut accumulator = DenseMatrix::identity(self.nrows());
        super::schur::compute_in_place_schur(&mut work, &mut accumulator, false)
    }
}
