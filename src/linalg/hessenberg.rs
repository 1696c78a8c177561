use crate::dense::DenseMatrix;
use crate::error::{Error, Result};
use crate::traits::FloatScalar;
use crate::transform::{householder_left, householder_right, Householder};

/// Check that `a` is square and `accumulator` has the same order.
pub(crate) fn check_pair<T>(a: &DenseMatrix<T>, accumulator: &DenseMatrix<T>) -> Result<usize> {
    let (rows, cols) = a.shape();
    if rows != cols {
        return Err(Error::NotSquare { rows, cols });
    }
    if accumulator.shape() != (rows, rows) {
        return Err(Error::shape((rows, rows), accumulator.shape()));
    }
    Ok(rows)
}

/// Reduce a square matrix to upper Hessenberg form via Householder
/// similarity transforms: `Qᵀ·A·Q = H`.
///
/// On return:
/// - `a` is overwritten with `H`; every entry below the first sub-diagonal
///   is exactly zero
/// - `accumulator`, holding some basis `B` on entry, holds `B·Q`
///
/// Columns whose sub-diagonal segment is already zero are skipped. Both
/// buffers are left untouched when the shapes are wrong.
///
/// ```
/// use densestore::DenseMatrix;
/// use densestore::linalg::hessenberg;
///
/// let a = DenseMatrix::from_rows(3, 3, &[4.0, 1.0, -2.0, 1.0, 2.0, 0.0, -2.0, 0.0, 3.0]).unwrap();
/// let mut h = a.clone();
/// let mut q = DenseMatrix::identity(3);
/// hessenberg(&mut h, &mut q).unwrap();
/// assert_eq!(h[(2, 0)], 0.0);
///
/// let qtaq = q.transpose().multiply(&a).unwrap().multiply(&q).unwrap();
/// assert!(qtaq.approx_eq(&h, 1e-12));
/// ```
pub fn hessenberg<T: FloatScalar>(a: &mut DenseMatrix<T>, accumulator: &mut DenseMatrix<T>) -> Result<()> {
    let n = check_pair(a, accumulator)?;

    let mut reflectors = Vec::with_capacity(n.saturating_sub(2));
    for k in 0..n.saturating_sub(2) {
        // Column k is settled by the hook; the updates below start at k + 1.
        let Some(h) = a.generate_apply_and_copy_householder_column(k + 1, k) else {
            reflectors.push(None);
            continue;
        };
        householder_left(a, &h, k + 1);
        householder_right(a, &h, 0);
        reflectors.push(Some(h));
    }

    if reflectors.iter().all(Option::is_none) {
        return Ok(());
    }

    if accumulator.is_identity() {
        accumulate_reflectors(accumulator, &reflectors);
    } else {
        let mut q = DenseMatrix::identity(n);
        accumulate_reflectors(&mut q, &reflectors);
        *accumulator = accumulator.multiply(&q)?;
    }
    log::trace!(
        target: "densestore::hessenberg",
        "reduced order {n} with {} reflectors",
        reflectors.iter().flatten().count()
    );
    Ok(())
}

/// `q ← P₀·P₁·…·q` for an identity `q`, applying the last reflector first so
/// each one only touches the trailing block it acts on.
fn accumulate_reflectors<T: FloatScalar>(q: &mut DenseMatrix<T>, reflectors: &[Option<Householder<T>>]) {
    for (k, h) in reflectors.iter().enumerate().rev() {
        if let Some(h) = h {
            householder_left(q, h, k + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use rand_distr::StandardNormal;

    const TOL: f64 = 1e-10;

    fn assert_similarity(orig: &DenseMatrix<f64>, h: &DenseMatrix<f64>, q: &DenseMatrix<f64>) {
        let n = orig.nrows();
        for j in 0..n {
            for i in j + 2..n {
                assert_eq!(h[(i, j)], 0.0, "H[({i},{j})] should be exactly zero");
            }
        }

        let qtaq = q.transpose().multiply(orig).unwrap().multiply(q).unwrap();
        for i in 0..n {
            for j in 0..n {
                assert!(
                    (qtaq[(i, j)] - h[(i, j)]).abs() < TOL,
                    "QᵀAQ[({i},{j})] = {}, H = {}",
                    qtaq[(i, j)],
                    h[(i, j)]
                );
            }
        }

        let qtq = q.transpose().multiply(q).unwrap();
        assert!(qtq.approx_eq(&DenseMatrix::identity(n), TOL), "Q not orthogonal");
    }

    #[test]
    fn hessenberg_4x4() {
        let orig = DenseMatrix::from_rows(
            4,
            4,
            &[
                1.0, 2.0, 3.0, 4.0, //
                5.0, 6.0, 7.0, 8.0, //
                9.0, 10.0, 11.0, 12.0, //
                13.0, 14.0, 15.0, 16.0,
            ],
        )
        .unwrap();
        let mut h = orig.clone();
        let mut q = DenseMatrix::identity(4);
        hessenberg(&mut h, &mut q).unwrap();
        assert_similarity(&orig, &h, &q);
    }

    #[test]
    fn hessenberg_random() {
        let orig: DenseMatrix<f64> = DenseMatrix::random(9, 9, &StandardNormal, &mut StdRng::seed_from_u64(3));
        let mut h = orig.clone();
        let mut q = DenseMatrix::identity(9);
        hessenberg(&mut h, &mut q).unwrap();
        assert_similarity(&orig, &h, &q);
        assert!(h.is_upper_hessenberg(0.0));
    }

    #[test]
    fn identity_unchanged() {
        let mut h = DenseMatrix::<f64>::identity(3);
        let mut q = DenseMatrix::<f64>::identity(3);
        hessenberg(&mut h, &mut q).unwrap();
        assert!(h.is_identity());
        assert!(q.is_identity());
    }

    #[test]
    fn already_upper_triangular() {
        let orig = DenseMatrix::from_rows(3, 3, &[1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 0.0, 0.0, 6.0]).unwrap();
        let mut h = orig.clone();
        let mut q = DenseMatrix::identity(3);
        hessenberg(&mut h, &mut q).unwrap();
        assert_eq!(h, orig);
        assert!(q.is_identity());
    }

    #[test]
    fn general_accumulator_is_right_multiplied() {
        let orig: DenseMatrix<f64> = DenseMatrix::random(6, 6, &StandardNormal, &mut StdRng::seed_from_u64(21));
        let basis: DenseMatrix<f64> = DenseMatrix::random(6, 6, &StandardNormal, &mut StdRng::seed_from_u64(22));

        let mut h1 = orig.clone();
        let mut q = DenseMatrix::identity(6);
        hessenberg(&mut h1, &mut q).unwrap();

        let mut h2 = orig.clone();
        let mut acc = basis.clone();
        hessenberg(&mut h2, &mut acc).unwrap();

        assert_eq!(h1, h2);
        assert!(acc.approx_eq(&basis.multiply(&q).unwrap(), TOL));
    }

    #[test]
    fn small_orders() {
        for n in 0..3 {
            let orig = DenseMatrix::from_fn(n, n, |i, j| (i * 3 + j) as f64 + 1.0);
            let mut h = orig.clone();
            let mut q = DenseMatrix::identity(n);
            hessenberg(&mut h, &mut q).unwrap();
            assert_eq!(h, orig);
            assert!(q.is_identity());
        }
    }

    #[test]
    fn shape_errors() {
        let mut a = DenseMatrix::<f64>::zeros(2, 3);
        let mut q = DenseMatrix::<f64>::identity(2);
        assert_eq!(hessenberg(&mut a, &mut q), Err(Error::NotSquare { rows: 2, cols: 3 }));

        let mut a = DenseMatrix::<f64>::identity(3);
        let mut q = DenseMatrix::<f64>::identity(2);
        assert_eq!(hessenberg(&mut a, &mut q), Err(Error::shape((3, 3), (2, 2))));
    }
}
