use crate::dense::DenseMatrix;
use crate::parallel::{self, Columns, KernelKind};
use crate::traits::FloatScalar;

/// An elementary reflector `P = I − u·uᵀ/β`.
///
/// `vector` spans the full row range of the matrix it acts on and is zero
/// above `first`. The vector is kept in the domain scaled by the 1-norm of
/// the generating segment; `P` is unaffected by that scaling.
#[derive(Debug, Clone, PartialEq)]
pub struct Householder<T> {
    pub vector: Vec<T>,
    pub first: usize,
    pub beta: T,
    /// The value `P·x` leaves at position `first`; every later entry of
    /// `P·x` is zero.
    pub image: T,
}

impl<T: FloatScalar> Householder<T> {
    /// Build the reflector that maps `segment[first..]` onto a multiple of
    /// the first unit vector.
    ///
    /// Returns `None` when the segment is all zeros.
    ///
    /// ```
    /// use densestore::transform::Householder;
    /// let h = Householder::generate(&[9.0_f64, 3.0, 4.0], 1).unwrap();
    /// assert_eq!(h.first, 1);
    /// assert!((h.image + 5.0).abs() < 1e-12);
    /// ```
    pub fn generate(segment: &[T], first: usize) -> Option<Self> {
        let x = &segment[first..];
        let scale = x.iter().fold(T::zero(), |acc, v| acc + v.abs());
        if scale == T::zero() || x.is_empty() {
            return None;
        }

        let mut vector = vec![T::zero(); segment.len()];
        let mut h = T::zero();
        for (u, &v) in vector[first..].iter_mut().zip(x) {
            *u = v / scale;
            h = h + *u * *u;
        }
        let mut g = h.sqrt();
        if vector[first] > T::zero() {
            g = -g;
        }
        let beta = h - vector[first] * g;
        vector[first] = vector[first] - g;

        Some(Self {
            vector,
            first,
            beta,
            image: scale * g,
        })
    }

    /// The tail `u[first..]`.
    #[inline]
    pub fn tail(&self) -> &[T] {
        &self.vector[self.first..]
    }

    /// Apply `P` to a vector of the same length in place.
    pub fn apply_to(&self, x: &mut [T]) {
        let u = self.tail();
        let x = &mut x[self.first..];
        let f = u.iter().zip(x.iter()).fold(T::zero(), |acc, (a, b)| acc + *a * *b) / self.beta;
        for (xi, &ui) in x.iter_mut().zip(u) {
            *xi = *xi - f * ui;
        }
    }
}

impl<T: FloatScalar> DenseMatrix<T> {
    /// Generate the reflector for column `col` from row `row` down, apply it
    /// to that column and return a copy.
    ///
    /// Afterwards the column holds the reflector's image at `row` and exact
    /// zeros below. Returns `None`, leaving the column untouched, when the
    /// segment is all zeros. The caller applies the reflector to the other
    /// columns, as a QR or bidiagonal driver does once per step.
    ///
    /// ```
    /// use densestore::DenseMatrix;
    /// let mut m: DenseMatrix<f64> = DenseMatrix::from_rows(3, 2, &[1.0, 0.0, 3.0, 0.0, 4.0, 0.0]).unwrap();
    /// let h = m.generate_apply_and_copy_householder_column(1, 0).unwrap();
    /// assert_eq!((m[(0, 0)], m[(2, 0)]), (1.0, 0.0));
    /// assert!((m[(1, 0)] + 5.0).abs() < 1e-12);
    /// assert_eq!(h.first, 1);
    /// assert!(m.generate_apply_and_copy_householder_column(0, 1).is_none());
    /// ```
    pub fn generate_apply_and_copy_householder_column(&mut self, row: usize, col: usize) -> Option<Householder<T>> {
        let h = Householder::generate(self.col(col), row)?;
        self.fill_column(row + 1, col, T::zero());
        self[(row, col)] = h.image;
        Some(h)
    }

    /// Row counterpart of
    /// [`generate_apply_and_copy_householder_column`](Self::generate_apply_and_copy_householder_column):
    /// the reflector spans column indices and annihilates row `row` right
    /// of `col`.
    pub fn generate_apply_and_copy_householder_row(&mut self, row: usize, col: usize) -> Option<Householder<T>> {
        let mut segment = Vec::with_capacity(self.ncols());
        self.visit_row(row, 0, |x| segment.push(x));
        let h = Householder::generate(&segment, col)?;
        self.fill_row(row, col + 1, T::zero());
        self[(row, col)] = h.image;
        Some(h)
    }
}

/// `M ← P·M` on columns `first_col..`, touching rows `h.first..`.
///
/// One dot product and one axpy per column, parallel over columns.
pub fn householder_left<T: FloatScalar>(m: &mut DenseMatrix<T>, h: &Householder<T>, first_col: usize) {
    assert_eq!(h.vector.len(), m.nrows(), "reflector length must match row count");
    if first_col >= m.ncols() {
        return;
    }
    parallel::dispatch(
        KernelKind::Householder,
        first_col,
        m.columns_from_mut(first_col),
        &|_, mut block: Columns<'_, T>| {
            for local in 0..block.ncols() {
                h.apply_to(block.col_mut(local));
            }
        },
    );
}

/// `M ← M·P` on rows `first_row..`, touching columns `h.first..`.
///
/// Two passes: the projections `w = M·u/β` over row blocks, then
/// `M[:, j] −= w·u_j` over columns.
pub fn householder_right<T: FloatScalar>(m: &mut DenseMatrix<T>, h: &Householder<T>, first_row: usize) {
    assert_eq!(h.vector.len(), m.ncols(), "reflector length must match column count");
    let nrows = m.nrows();
    if first_row >= nrows {
        return;
    }
    let mut w = vec![T::zero(); nrows - first_row];
    {
        let m: &DenseMatrix<T> = m;
        parallel::dispatch(KernelKind::Householder, first_row, w.as_mut_slice(), &|row0, block: &mut [T]| {
            for (local, wi) in block.iter_mut().enumerate() {
                let i = row0 + local;
                let mut acc = T::zero();
                for (j, &uj) in h.vector.iter().enumerate().skip(h.first) {
                    acc = acc + m.data[i + nrows * j] * uj;
                }
                *wi = acc / h.beta;
            }
        });
    }
    let w = &w;
    parallel::dispatch(
        KernelKind::Householder,
        h.first,
        m.columns_from_mut(h.first),
        &|col0, mut block: Columns<'_, T>| {
            for local in 0..block.ncols() {
                let uj = h.vector[col0 + local];
                for (x, &wi) in block.col_mut(local)[first_row..].iter_mut().zip(w) {
                    *x = *x - wi * uj;
                }
            }
        },
    );
}

/// `A ← P·A·P` for a symmetric `A`, as `A − u·vᵀ − v·uᵀ` with
/// `p = A·u/β` and `v = p − (uᵀp / 2β)·u`.
pub fn householder_symmetric<T: FloatScalar>(a: &mut DenseMatrix<T>, h: &Householder<T>) {
    let n = a.nrows();
    assert!(a.is_square(), "symmetric transform requires a square matrix");
    assert_eq!(h.vector.len(), n, "reflector length must match order");
    let u = &h.vector;

    let mut p = vec![T::zero(); n];
    {
        let a: &DenseMatrix<T> = a;
        parallel::dispatch(KernelKind::Householder, 0, p.as_mut_slice(), &|row0, block: &mut [T]| {
            for (local, pi) in block.iter_mut().enumerate() {
                let i = row0 + local;
                let mut acc = T::zero();
                for (k, &uk) in u.iter().enumerate().skip(h.first) {
                    acc = acc + a.data[i + n * k] * uk;
                }
                *pi = acc / h.beta;
            }
        });
    }
    let k = u.iter().zip(&p).fold(T::zero(), |acc, (ui, pi)| acc + *ui * *pi) / (T::two() * h.beta);
    let v: Vec<T> = p.iter().zip(u).map(|(&pi, &ui)| pi - k * ui).collect();

    let v = &v;
    parallel::dispatch(KernelKind::Householder, 0, a.columns_mut(), &|col0, mut block: Columns<'_, T>| {
        for local in 0..block.ncols() {
            let j = col0 + local;
            let (uj, vj) = (u[j], v[j]);
            for (i, x) in block.col_mut(local).iter_mut().enumerate() {
                *x = *x - u[i] * vj - v[i] * uj;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::{with_thresholds, Thresholds};
    use rand::{rngs::StdRng, SeedableRng};
    use rand_distr::StandardNormal;

    const TOL: f64 = 1e-12;

    fn assert_near(a: f64, b: f64, tol: f64, msg: &str) {
        assert!((a - b).abs() < tol, "{msg}: {a} vs {b} (diff {})", (a - b).abs());
    }

    fn reflector_matrix(h: &Householder<f64>) -> DenseMatrix<f64> {
        let n = h.vector.len();
        DenseMatrix::from_fn(n, n, |i, j| {
            let id = if i == j { 1.0 } else { 0.0 };
            id - h.vector[i] * h.vector[j] / h.beta
        })
    }

    #[test]
    fn column_hook_matches_full_application() {
        let a: DenseMatrix<f64> = DenseMatrix::random(6, 4, &StandardNormal, &mut StdRng::seed_from_u64(3));
        let mut hooked = a.clone();
        let h = hooked.generate_apply_and_copy_householder_column(2, 1).unwrap();
        householder_left(&mut hooked, &h, 2);

        // Columns from the pivot on match P·A; earlier ones are left alone.
        let full = reflector_matrix(&h).multiply(&a).unwrap();
        for j in 1..4 {
            for i in 0..6 {
                assert_near(hooked[(i, j)], full[(i, j)], TOL, &format!("({i}, {j})"));
            }
        }
        assert_eq!(&hooked.col(1)[3..], &[0.0; 3]);
        assert_eq!(hooked.col(0), a.col(0));
    }

    #[test]
    fn row_hook_matches_full_application() {
        let a: DenseMatrix<f64> = DenseMatrix::random(4, 6, &StandardNormal, &mut StdRng::seed_from_u64(4));
        let mut hooked = a.clone();
        let h = hooked.generate_apply_and_copy_householder_row(1, 2).unwrap();
        assert_eq!(h.vector.len(), 6);
        householder_right(&mut hooked, &h, 2);

        // Rows from the pivot on match A·P; earlier ones are left alone.
        let full = a.multiply(&reflector_matrix(&h)).unwrap();
        for i in 1..4 {
            for j in 0..6 {
                assert_near(hooked[(i, j)], full[(i, j)], TOL, &format!("({i}, {j})"));
            }
        }
        for j in 3..6 {
            assert_eq!(hooked[(1, j)], 0.0);
        }
        for j in 0..6 {
            assert_eq!(hooked[(0, j)], a[(0, j)]);
        }
    }

    #[test]
    fn hooks_skip_zero_segments() {
        let mut m = DenseMatrix::from_rows(2, 3, &[1.0, 2.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        let before = m.clone();
        assert!(m.generate_apply_and_copy_householder_row(1, 0).is_none());
        assert!(m.generate_apply_and_copy_householder_row(0, 2).is_none());
        assert!(m.generate_apply_and_copy_householder_column(1, 1).is_none());
        assert_eq!(m, before);
    }

    #[test]
    fn generate_annihilates_tail() {
        let x = [1.0, -2.0, 2.0, 4.0, 0.5];
        let h = Householder::generate(&x, 1).unwrap();
        let mut y = x;
        h.apply_to(&mut y);
        assert_eq!(y[0], 1.0);
        assert_near(y[1], h.image, TOL, "image");
        for (i, &yi) in y.iter().enumerate().skip(2) {
            assert_near(yi, 0.0, TOL, &format!("y[{i}]"));
        }
        // x[1] < 0, so the image is +||x[1..]||
        assert_near(h.image, 24.25f64.sqrt(), TOL, "norm");
    }

    #[test]
    fn generate_zero_segment() {
        assert!(Householder::generate(&[1.0, 0.0, 0.0], 1).is_none());
        assert!(Householder::generate(&[1.0_f64], 1).is_none());
    }

    #[test]
    fn reflector_is_orthogonal() {
        let h = Householder::generate(&[3.0, 1.0, -4.0, 2.0], 0).unwrap();
        let p = reflector_matrix(&h);
        let ptp = p.transpose().multiply(&p).unwrap();
        assert!(ptp.approx_eq(&DenseMatrix::identity(4), TOL));
    }

    #[test]
    fn left_and_right_match_explicit_products() {
        let m: DenseMatrix<f64> = DenseMatrix::random(5, 5, &StandardNormal, &mut StdRng::seed_from_u64(11));
        let h = Householder::generate(m.col(0), 1).unwrap();
        let p = reflector_matrix(&h);

        let mut left = m.clone();
        householder_left(&mut left, &h, 0);
        assert!(left.approx_eq(&p.multiply(&m).unwrap(), TOL));
        assert_near(left[(1, 0)], h.image, TOL, "left image");

        let mut right = m.clone();
        householder_right(&mut right, &h, 0);
        assert!(right.approx_eq(&m.multiply(&p).unwrap(), TOL));
    }

    #[test]
    fn symmetric_matches_two_sided() {
        let b: DenseMatrix<f64> = DenseMatrix::random(6, 6, &StandardNormal, &mut StdRng::seed_from_u64(5));
        let a = &b + &b.transpose();
        let h = Householder::generate(a.col(0), 1).unwrap();

        let mut expected = a.clone();
        householder_left(&mut expected, &h, 0);
        householder_right(&mut expected, &h, 0);

        let mut sym = a.clone();
        householder_symmetric(&mut sym, &h);
        assert!(sym.approx_eq(&expected, 1e-10));
    }

    #[test]
    fn parallel_bit_identical() {
        let m: DenseMatrix<f64> = DenseMatrix::random(9, 9, &StandardNormal, &mut StdRng::seed_from_u64(8));
        let h = Householder::generate(m.col(2), 3).unwrap();
        let run = |t: Thresholds| {
            with_thresholds(t, || {
                let mut x = m.clone();
                householder_left(&mut x, &h, 2);
                householder_right(&mut x, &h, 1);
                householder_symmetric(&mut x, &h);
                x
            })
        };
        assert_eq!(run(Thresholds::serial()), run(Thresholds::eager()));
    }
}
