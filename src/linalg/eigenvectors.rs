//! Eigenvectors of a real Schur form by back-substitution.
//!
//! Each eigenvalue's triangular system is solved in place in the columns of
//! the quasi-triangular matrix, last index first, then the accumulated
//! Schur vectors are multiplied through to get eigenvectors of the original
//! matrix.

use num_complex::Complex;

use super::schur::Spectrum;
use crate::dense::DenseMatrix;
use crate::error::Result;
use crate::traits::{FloatScalar, MatrixMut};

/// Overwrite `h` with the upper-triangular eigenvector basis of the Schur
/// form it holds and `accumulator` with `accumulator · basis`.
///
/// For a real eigenvalue at slot `i` column `i` holds its vector; for a pair
/// at `(i, i+1)` columns `i` and `i+1` hold the real and imaginary parts of
/// the vector belonging to slot `i`.
pub(crate) fn back_substitute<T: FloatScalar>(
    h: &mut DenseMatrix<T>,
    accumulator: &mut DenseMatrix<T>,
    spectrum: &Spectrum<T>,
) -> Result<()> {
    let n = h.nrows();

    // The basis does not depend on the overall scale of `h`, so solve in
    // the units the iteration ran in.
    let scaled;
    let spectrum = if spectrum.scale != T::one() {
        let scale = spectrum.scale;
        h.modify_all(|x| x / scale);
        scaled = spectrum.scaled_down();
        &scaled
    } else {
        spectrum
    };

    for en in (0..n).rev() {
        let q = spectrum.im[en];
        if q == T::zero() {
            real_vector(h, spectrum, en);
        } else if q < T::zero() {
            complex_vector(h, spectrum, en);
        }
    }

    let basis = DenseMatrix::from_fn(n, n, |i, j| if i <= j { h[(i, j)] } else { T::zero() });
    *accumulator = accumulator.multiply(&basis)?;
    log::trace!(target: "densestore::schur", "back-substituted {n} eigenvectors");
    Ok(())
}

/// `a / b` by Smith's algorithm, which scales by the larger component of
/// `b` instead of forming `|b|²`.
fn cdiv<T: FloatScalar>(a: Complex<T>, b: Complex<T>) -> Complex<T> {
    if b.re.abs() > b.im.abs() {
        let r = b.im / b.re;
        let d = b.re + r * b.im;
        Complex::new((a.re + r * a.im) / d, (a.im - r * a.re) / d)
    } else {
        let r = b.re / b.im;
        let d = b.im + r * b.re;
        Complex::new((r * a.re + a.im) / d, (r * a.im - a.re) / d)
    }
}

/// Rescale rows `from..=to` of the given columns when `t` is large enough
/// for its square to overflow after scaling by epsilon.
fn control_overflow<T: FloatScalar>(h: &mut DenseMatrix<T>, cols: &[usize], from: usize, to: usize, t: T) {
    if T::epsilon() * t * t > T::one() {
        for &c in cols {
            for x in &mut h.col_as_mut_slice(c, from)[..=to - from] {
                *x = *x / t;
            }
        }
    }
}

/// Solve `(T − λI)·v = 0` for the real eigenvalue at `en`, into column `en`.
fn real_vector<T: FloatScalar>(h: &mut DenseMatrix<T>, spectrum: &Spectrum<T>, en: usize) {
    let Spectrum { re, im, norm1, .. } = spectrum;
    let eps = T::epsilon();
    let p = re[en];

    // Saved from the lower row of a 2×2 block for the row above it.
    let (mut z, mut s) = (T::zero(), T::zero());
    let mut l = en;
    h[(en, en)] = T::one();

    for i in (0..en).rev() {
        let w = h[(i, i)] - p;
        let r = (l..=en).fold(T::zero(), |acc, j| acc + h[(i, j)] * h[(j, en)]);

        if im[i] < T::zero() {
            z = w;
            s = r;
            continue;
        }
        l = i;
        if im[i] == T::zero() {
            let pivot = if w != T::zero() { w } else { eps * *norm1 };
            h[(i, en)] = -r / pivot;
        } else {
            let x = h[(i, i + 1)];
            let y = h[(i + 1, i)];
            let q = (re[i] - p) * (re[i] - p) + im[i] * im[i];
            let t = (x * s - z * r) / q;
            h[(i, en)] = t;
            h[(i + 1, en)] = if x.abs() > z.abs() {
                (-r - w * t) / x
            } else {
                (-s - y * t) / z
            };
        }

        let t = h[(i, en)].abs();
        control_overflow(h, &[en], i, en, t);
    }
}

/// Solve for the complex pair whose lower slot is `en`, into columns
/// `en − 1` (real part) and `en` (imaginary part).
fn complex_vector<T: FloatScalar>(h: &mut DenseMatrix<T>, spectrum: &Spectrum<T>, en: usize) {
    let Spectrum { re, im, norm1, .. } = spectrum;
    let eps = T::epsilon();
    let p = re[en];
    let q = im[en];
    let na = en - 1;

    if h[(en, na)].abs() > h[(na, en)].abs() {
        h[(na, na)] = q / h[(en, na)];
        h[(na, en)] = -(h[(en, en)] - p) / h[(en, na)];
    } else {
        let c = cdiv(Complex::new(T::zero(), -h[(na, en)]), Complex::new(h[(na, na)] - p, q));
        h[(na, na)] = c.re;
        h[(na, en)] = c.im;
    }
    h[(en, na)] = T::zero();
    h[(en, en)] = T::one();

    let (mut z, mut r, mut s) = (T::zero(), T::zero(), T::zero());
    let mut l = na;
    for i in (0..na).rev() {
        let (ra, sa) = (l..=en).fold((T::zero(), T::zero()), |(ra, sa), j| {
            (ra + h[(i, j)] * h[(j, na)], sa + h[(i, j)] * h[(j, en)])
        });
        let w = h[(i, i)] - p;

        if im[i] < T::zero() {
            z = w;
            r = ra;
            s = sa;
            continue;
        }
        l = i;
        if im[i] == T::zero() {
            let c = cdiv(Complex::new(-ra, -sa), Complex::new(w, q));
            h[(i, na)] = c.re;
            h[(i, en)] = c.im;
        } else {
            let x = h[(i, i + 1)];
            let y = h[(i + 1, i)];
            let mut vr = (re[i] - p) * (re[i] - p) + im[i] * im[i] - q * q;
            let vi = (re[i] - p) * T::two() * q;
            if vr == T::zero() && vi == T::zero() {
                vr = eps * *norm1 * (w.abs() + q.abs() + x.abs() + y.abs() + z.abs());
            }
            let c = cdiv(Complex::new(x * r - z * ra + q * sa, x * s - z * sa - q * ra), Complex::new(vr, vi));
            h[(i, na)] = c.re;
            h[(i, en)] = c.im;

            if x.abs() > z.abs() + q.abs() {
                h[(i + 1, na)] = (-ra - w * h[(i, na)] + q * h[(i, en)]) / x;
                h[(i + 1, en)] = (-sa - w * h[(i, en)] - q * h[(i, na)]) / x;
            } else {
                let c = cdiv(Complex::new(-r - y * h[(i, na)], -s - y * h[(i, en)]), Complex::new(z, q));
                h[(i + 1, na)] = c.re;
                h[(i + 1, en)] = c.im;
            }
        }

        let t = h[(i, na)].abs().max(h[(i, en)].abs());
        control_overflow(h, &[na, en], i, en, t);
    }
}

#[cfg(test)]
mod tests {
    use super::cdiv;
    use crate::linalg::compute_in_place_schur;
    use crate::DenseMatrix;
    use num_complex::Complex;
    use rand::{rngs::StdRng, SeedableRng};
    use rand_distr::StandardNormal;

    /// `‖A·v − λ·v‖∞` for the eigenvector of slot `i` in the packed layout.
    fn residual(a: &DenseMatrix<f64>, v: &DenseMatrix<f64>, values: &[Complex<f64>], i: usize) -> f64 {
        let n = a.nrows();
        let vector: Vec<Complex<f64>> = if values[i].im == 0.0 {
            v.col(i).iter().map(|&x| Complex::new(x, 0.0)).collect()
        } else if values[i].im > 0.0 {
            (0..n).map(|k| Complex::new(v[(k, i)], v[(k, i + 1)])).collect()
        } else {
            (0..n).map(|k| Complex::new(v[(k, i - 1)], -v[(k, i)])).collect()
        };
        (0..n)
            .map(|row| {
                let av = (0..n).fold(Complex::new(0.0, 0.0), |acc, k| acc + vector[k] * a[(row, k)]);
                (av - values[i] * vector[row]).norm()
            })
            .fold(0.0, f64::max)
    }

    fn check_pairs(a: &DenseMatrix<f64>) {
        let mut s = a.clone();
        let mut v = DenseMatrix::identity(a.nrows());
        let values = compute_in_place_schur(&mut s, &mut v, true).unwrap();
        let scale = a.max_abs().max(1.0) * v.max_abs().max(1.0);
        for i in 0..a.nrows() {
            let res = residual(a, &v, &values, i);
            assert!(res < 1e-10 * scale, "slot {i} ({}): residual {res}", values[i]);
        }
    }

    #[test]
    fn real_spectrum() {
        let a = DenseMatrix::from_rows(
            3,
            3,
            &[
                2.0, 1.0, 0.0, //
                1.0, 3.0, 1.0, //
                0.0, 1.0, 4.0,
            ],
        )
        .unwrap();
        check_pairs(&a);
    }

    #[test]
    fn complex_spectrum() {
        let a = DenseMatrix::from_rows(
            4,
            4,
            &[
                0.0, -1.0, 2.0, 0.5, //
                1.0, 0.0, -1.0, 1.0, //
                0.0, 0.0, 1.0, -3.0, //
                0.0, 0.0, 3.0, 1.0,
            ],
        )
        .unwrap();
        check_pairs(&a);
    }

    #[test]
    fn random_matrices() {
        for seed in [1, 2, 3] {
            let a: DenseMatrix<f64> = DenseMatrix::random(9, 9, &StandardNormal, &mut StdRng::seed_from_u64(seed));
            check_pairs(&a);
        }
    }

    #[test]
    fn repeated_eigenvalue() {
        // A Jordan-like block: the zero-pivot replacement keeps the solve finite.
        let a = DenseMatrix::from_rows(3, 3, &[2.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 5.0]).unwrap();
        let mut s = a.clone();
        let mut v: DenseMatrix<f64> = DenseMatrix::identity(3);
        compute_in_place_schur(&mut s, &mut v, true).unwrap();
        assert!(v.as_slice().iter().all(|x| x.is_finite()));
    }

    #[test]
    fn smith_division_matches_plain_division() {
        let a = Complex::new(3.0, -2.0);
        for b in [Complex::new(1.5, 0.25), Complex::new(-0.5, 4.0), Complex::new(2.0, -2.0)] {
            assert!((cdiv(a, b) - a / b).norm() < 1e-14);
        }
    }

    #[test]
    fn smith_division_survives_huge_and_tiny_denominators() {
        // |b|² overflows to infinity here, and underflows to zero below.
        let q: Complex<f64> = cdiv(Complex::new(1.0, 1.0), Complex::new(1e300, 1e300));
        assert!((q.re * 1e300 - 1.0).abs() < 1e-15, "{q}");
        assert_eq!(q.im, 0.0);

        let q = cdiv(Complex::new(1e-300, 0.0), Complex::new(0.0, 1e-300));
        assert!((q - Complex::new(0.0, -1.0)).norm() < 1e-15, "{q}");
    }

    #[test]
    fn extreme_scales() {
        let base = DenseMatrix::from_rows(
            4,
            4,
            &[
                0.0, -1.0, 2.0, 0.5, //
                1.0, 0.0, -1.0, 1.0, //
                0.0, 0.0, 1.0, -3.0, //
                0.5, 0.0, 3.0, 1.0,
            ],
        )
        .unwrap();
        for factor in [1e200, 1e-200] {
            let a = &base * factor;
            let mut s = a.clone();
            let mut v: DenseMatrix<f64> = DenseMatrix::identity(4);
            let values = compute_in_place_schur(&mut s, &mut v, true).unwrap();
            assert!(v.as_slice().iter().all(|x| x.is_finite()));
            for i in 0..4 {
                let res = residual(&a, &v, &values, i);
                assert!(res < 1e-10 * a.max_abs() * v.max_abs(), "factor {factor:e} slot {i}: residual {res:e}");
            }
        }
    }
}
