//! Real Schur decomposition by the Francis double-shift QR algorithm.
//!
//! The input is an upper Hessenberg matrix `H` and an accumulator `V`. The
//! iteration chases 3×3 bulges down the sub-diagonal and deflates 1×1 and
//! 2×2 blocks from the bottom, until `H` is quasi-upper-triangular and
//! `V ← V·Q` with `Qᵀ·H·Q` the final form.
//!
//! Bulk updates (row sweeps, column sweeps, accumulator updates) run through
//! the parallel dispatcher; the iteration itself is sequential.

use core::ops::Range;

use num_complex::Complex;

use super::eigenvectors::back_substitute;
use super::hessenberg::{check_pair, hessenberg};
use crate::dense::DenseMatrix;
use crate::error::{Error, Result};
use crate::parallel::{self, Columns, KernelKind};
use crate::traits::FloatScalar;
use crate::transform::{rotate_columns, rotate_rows, two_columns_mut};

/// Tuning for the QR iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchurOptions {
    /// Total number of QR steps allowed across all deflations. `None`
    /// iterates until convergence.
    pub max_iterations: Option<usize>,
}

impl SchurOptions {
    /// The default cap for a matrix of order `n`: `100·max(n, 1)` steps.
    pub fn for_order(n: usize) -> Self {
        Self {
            max_iterations: Some(100 * n.max(1)),
        }
    }

    /// No cap.
    pub const fn unbounded() -> Self {
        Self { max_iterations: None }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }
}

/// Eigenvalues of a converged quasi-triangular form, split in real and
/// imaginary parts, plus the 1-norm of the Hessenberg input.
#[derive(Debug, Clone)]
pub(crate) struct Spectrum<T> {
    pub re: Vec<T>,
    pub im: Vec<T>,
    pub norm1: T,
    /// Power of two the iteration divided the matrix by. One when the
    /// entries were left as given.
    pub scale: T,
}

impl<T: FloatScalar> Spectrum<T> {
    pub fn values(&self) -> Vec<Complex<T>> {
        self.re.iter().zip(&self.im).map(|(&re, &im)| Complex::new(re, im)).collect()
    }

    /// The same spectrum in the units of a matrix divided by `scale`.
    pub fn scaled_down(&self) -> Self {
        let scale = self.scale;
        Self {
            re: self.re.iter().map(|&x| x / scale).collect(),
            im: self.im.iter().map(|&x| x / scale).collect(),
            norm1: self.norm1 / scale,
            scale: T::one(),
        }
    }
}

/// One step of the bulge chase: `P = I − v·wᵀ` acting on two or three
/// consecutive indices starting at `k`, written in the scaled form the
/// iteration builds it in.
#[derive(Debug, Clone, Copy)]
struct BulgeReflector<T> {
    k: usize,
    x: T,
    y: T,
    z: T,
    q: T,
    r: T,
    three: bool,
}

impl<T: FloatScalar> BulgeReflector<T> {
    /// Apply to rows `k..k+3` of a single column.
    #[inline]
    fn apply_down(&self, col: &mut [T]) {
        let k = self.k;
        let mut p = col[k] + self.q * col[k + 1];
        if self.three {
            p = p + self.r * col[k + 2];
            col[k + 2] = col[k + 2] - p * self.z;
        }
        col[k] = col[k] - p * self.x;
        col[k + 1] = col[k + 1] - p * self.y;
    }

    /// `M ← P·M` over the given columns.
    fn apply_rows(&self, m: &mut DenseMatrix<T>, cols: Range<usize>) {
        if cols.is_empty() {
            return;
        }
        let nrows = m.nrows();
        let data = &mut m.as_mut_slice()[cols.start * nrows..cols.end * nrows];
        let block = Columns::new(data, nrows, cols.len());
        parallel::dispatch(KernelKind::Householder, cols.start, block, &|_, mut block: Columns<'_, T>| {
            for local in 0..block.ncols() {
                self.apply_down(block.col_mut(local));
            }
        });
    }

    /// `M ← M·P` over the given rows.
    fn apply_columns(&self, m: &mut DenseMatrix<T>, rows: Range<usize>) {
        if rows.is_empty() {
            return;
        }
        let Self { k, x, y, z, q, r, .. } = *self;
        if !self.three {
            let pair = two_columns_mut(m, k, k + 1, rows);
            parallel::dispatch(KernelKind::Householder, 0, pair, &|_, (a, b): (&mut [T], &mut [T])| {
                for (ai, bi) in a.iter_mut().zip(b.iter_mut()) {
                    let p = x * *ai + y * *bi;
                    *ai = *ai - p;
                    *bi = *bi - p * q;
                }
            });
            return;
        }

        let nrows = m.nrows();
        let block = &mut m.as_mut_slice()[k * nrows..(k + 3) * nrows];
        let (a, rest) = block.split_at_mut(nrows);
        let (b, c) = rest.split_at_mut(nrows);
        let triple = (
            (&mut a[rows.clone()], &mut b[rows.clone()]),
            &mut c[rows],
        );
        parallel::dispatch(
            KernelKind::Householder,
            0,
            triple,
            &|_, ((a, b), c): ((&mut [T], &mut [T]), &mut [T])| {
                for ((ai, bi), ci) in a.iter_mut().zip(b.iter_mut()).zip(c.iter_mut()) {
                    let p = x * *ai + y * *bi + z * *ci;
                    *ci = *ci - p * r;
                    *ai = *ai - p;
                    *bi = *bi - p * q;
                }
            },
        );
    }
}

/// 1-norm of the Hessenberg part of `h`, summed over every entry.
fn hessenberg_norm1<T: FloatScalar>(h: &DenseMatrix<T>) -> T {
    let n = h.nrows();
    (0..n).fold(T::zero(), |acc, j| {
        let last = (j + 1).min(n - 1);
        h.col(j)[..=last].iter().fold(acc, |acc, v| acc + v.abs())
    })
}

/// Subtract `shift` from the leading `len` diagonal entries.
fn shift_diagonal<T: FloatScalar>(h: &mut DenseMatrix<T>, len: usize, shift: T) {
    for i in 0..len {
        h[(i, i)] = h[(i, i)] - shift;
    }
}

/// Power of two bringing `norm1` close to one, or one when products of
/// entries that large (or that small) stay finite and normal.
///
/// Dividing by a power of two is exact, so the rescaled iteration sees the
/// same matrix up to its exponent.
fn iteration_scale<T: FloatScalar>(norm1: T) -> T {
    let big = T::max_value().sqrt() * T::epsilon();
    let small = T::min_positive_value().sqrt() / T::epsilon();
    if !norm1.is_finite() || (norm1 >= small && norm1 <= big) {
        return T::one();
    }
    // 2^±limit stays finite and normal for every exponent in range.
    let limit = -T::min_positive_value().log2().floor();
    let exponent = norm1.log2().floor().max(-limit).min(limit);
    num_traits::ToPrimitive::to_i32(&exponent).map_or_else(T::one, |e| T::two().powi(e))
}

/// Run the QR iteration on an upper Hessenberg `h` until every diagonal
/// block has converged, accumulating the rotations into `accumulator`.
///
/// Matrices whose entries would overflow (or underflow) in the shift
/// products are iterated on a copy divided by [`iteration_scale`]; the
/// Schur form and eigenvalues are scaled back before returning.
pub(crate) fn reduce_to_schur<T: FloatScalar>(
    h: &mut DenseMatrix<T>,
    accumulator: &mut DenseMatrix<T>,
    options: &SchurOptions,
) -> Result<Spectrum<T>> {
    let n = h.nrows();
    let norm1 = if n == 0 { T::zero() } else { hessenberg_norm1(h) };
    let mut re = vec![T::zero(); n];
    let mut im = vec![T::zero(); n];

    // A zero Hessenberg part is already triangular with a zero spectrum.
    if norm1 == T::zero() {
        return Ok(Spectrum { re, im, norm1, scale: T::one() });
    }

    let scale = iteration_scale(norm1);
    if scale != T::one() {
        log::debug!(target: "densestore::schur", "rescaling order {n} matrix with 1-norm {norm1:?} by {scale:?}");
        h.modify_all(|x| x / scale);
    }

    let outcome = qr_iterate(h, accumulator, norm1 / scale, options, &mut re, &mut im);

    if scale != T::one() {
        h.modify_all(|x| x * scale);
        for x in re.iter_mut().chain(im.iter_mut()) {
            *x = *x * scale;
        }
    }
    outcome?;
    Ok(Spectrum { re, im, norm1, scale })
}

/// The QR iteration proper, on a matrix with 1-norm `norm1`.
fn qr_iterate<T: FloatScalar>(
    h: &mut DenseMatrix<T>,
    accumulator: &mut DenseMatrix<T>,
    norm1: T,
    options: &SchurOptions,
    re: &mut [T],
    im: &mut [T],
) -> Result<()> {
    let n = h.nrows();
    let eps = T::epsilon();
    let mut exshift = T::zero();
    let mut iterations = 0usize;
    let mut total = 0usize;
    let mut active = n;

    while active > 0 {
        let m = active - 1;

        let mut l = m;
        while l > 0 {
            let mut s = h[(l - 1, l - 1)].abs() + h[(l, l)].abs();
            if s == T::zero() {
                s = norm1;
            }
            if h[(l, l - 1)].abs() < eps * s {
                break;
            }
            l -= 1;
        }

        if l == m {
            h[(m, m)] = h[(m, m)] + exshift;
            re[m] = h[(m, m)];
            im[m] = T::zero();
            log::trace!(target: "densestore::schur", "deflated 1x1 block at {m} after {iterations} steps");
            active -= 1;
            iterations = 0;
        } else if l + 1 == m {
            deflate_pair(h, accumulator, m, exshift, re, im);
            log::trace!(target: "densestore::schur", "deflated 2x2 block at {} after {iterations} steps", m - 1);
            active -= 2;
            iterations = 0;
        } else {
            if options.max_iterations.is_some_and(|cap| total >= cap) {
                log::warn!(
                    target: "densestore::schur",
                    "no convergence after {total} QR steps ({active} of {n} eigenvalues unresolved)"
                );
                return Err(Error::NoConvergence { iterations: total });
            }

            let (x, y, w) = next_shift(h, m, iterations, &mut exshift);
            iterations += 1;
            total += 1;
            double_shift_step(h, accumulator, l, m, x, y, w);
        }
    }

    log::debug!(target: "densestore::schur", "order {n} converged in {total} QR steps");
    Ok(())
}

/// Shift parameters `(x, y, w)` for the next QR step on the block ending at
/// `m`, after `iterations` steps without a deflation.
///
/// The trailing 2×2 block gives the standard double shift. Steps 10 and 30
/// use exceptional shifts instead; these move the active diagonal and add
/// the move to `exshift`. Step 30 only fires when its quadratic has real
/// roots.
fn next_shift<T: FloatScalar>(h: &mut DenseMatrix<T>, m: usize, iterations: usize, exshift: &mut T) -> (T, T, T) {
    let mut x = h[(m, m)];
    let mut y = h[(m - 1, m - 1)];
    let mut w = h[(m, m - 1)] * h[(m - 1, m)];

    if iterations == 10 {
        *exshift = *exshift + x;
        shift_diagonal(h, m + 1, x);
        let s = h[(m, m - 1)].abs() + h[(m - 1, m - 2)].abs();
        x = T::lit(0.75) * s;
        y = x;
        w = T::lit(-0.4375) * s * s;
        log::debug!(target: "densestore::schur", "exceptional shift at {m}");
    }

    if iterations == 30 {
        let half_gap = (y - x) * T::half();
        let mut s = half_gap * half_gap + w;
        if s > T::zero() {
            s = s.sqrt();
            if y < x {
                s = -s;
            }
            s = x - w / (half_gap + s);
            shift_diagonal(h, m + 1, s);
            *exshift = *exshift + s;
            x = T::lit(0.964);
            y = x;
            w = x;
            log::debug!(target: "densestore::schur", "second exceptional shift at {m}");
        }
    }

    (x, y, w)
}

/// Record the eigenvalues of the trailing 2×2 block ending at `m` and, for a
/// real pair, rotate it to upper triangular.
fn deflate_pair<T: FloatScalar>(
    h: &mut DenseMatrix<T>,
    accumulator: &mut DenseMatrix<T>,
    m: usize,
    exshift: T,
    re: &mut [T],
    im: &mut [T],
) {
    let n = h.nrows();
    let w = h[(m, m - 1)] * h[(m - 1, m)];
    let p = (h[(m - 1, m - 1)] - h[(m, m)]) * T::half();
    let q = p * p + w;
    let mut z = q.abs().sqrt();
    h[(m, m)] = h[(m, m)] + exshift;
    h[(m - 1, m - 1)] = h[(m - 1, m - 1)] + exshift;
    let x = h[(m, m)];

    if q < T::zero() {
        re[m - 1] = x + p;
        re[m] = x + p;
        im[m - 1] = z;
        im[m] = -z;
        return;
    }

    z = if p >= T::zero() { p + z } else { p - z };
    re[m - 1] = x + z;
    re[m] = if z != T::zero() { x - w / z } else { x + z };
    im[m - 1] = T::zero();
    im[m] = T::zero();

    let sub = h[(m, m - 1)];
    let s = sub.abs() + z.abs();
    if s == T::zero() {
        return;
    }
    let (p, q) = (sub / s, z / s);
    let r = (p * p + q * q).sqrt();
    let (sin, cos) = (p / r, q / r);

    rotate_rows(h, m - 1, m, cos, sin, m - 1..n);
    rotate_columns(h, m - 1, m, cos, sin, 0..m + 1);
    rotate_columns(accumulator, m - 1, m, cos, sin, 0..n);
}

/// One Francis double-shift step on the active block `l..=m`.
fn double_shift_step<T: FloatScalar>(
    h: &mut DenseMatrix<T>,
    accumulator: &mut DenseMatrix<T>,
    l: usize,
    m: usize,
    x: T,
    y: T,
    w: T,
) {
    let n = h.nrows();
    let eps = T::epsilon();

    // Look for two consecutive small sub-diagonal elements.
    let mut start = m - 2;
    let (mut p, mut q, mut r);
    loop {
        let z = h[(start, start)];
        let rr = x - z;
        let ss = y - z;
        p = (rr * ss - w) / h[(start + 1, start)] + h[(start, start + 1)];
        q = h[(start + 1, start + 1)] - z - rr - ss;
        r = h[(start + 2, start + 1)];
        let s = p.abs() + q.abs() + r.abs();
        p = p / s;
        q = q / s;
        r = r / s;
        if start == l {
            break;
        }
        let lhs = h[(start, start - 1)].abs() * (q.abs() + r.abs());
        let rhs = eps * (p.abs() * (h[(start - 1, start - 1)].abs() + z.abs() + h[(start + 1, start + 1)].abs()));
        if lhs < rhs {
            break;
        }
        start -= 1;
    }

    for i in start + 2..=m {
        h[(i, i - 2)] = T::zero();
        if i > start + 2 {
            h[(i, i - 3)] = T::zero();
        }
    }

    for k in start..m {
        let three = k + 1 != m;
        let mut scale = T::zero();
        if k != start {
            p = h[(k, k - 1)];
            q = h[(k + 1, k - 1)];
            r = if three { h[(k + 2, k - 1)] } else { T::zero() };
            scale = p.abs() + q.abs() + r.abs();
            if scale == T::zero() {
                continue;
            }
            p = p / scale;
            q = q / scale;
            r = r / scale;
        }

        let mut s = (p * p + q * q + r * r).sqrt();
        if p < T::zero() {
            s = -s;
        }
        if s == T::zero() {
            continue;
        }

        if k != start {
            // The reflector maps this column onto its first entry.
            h[(k, k - 1)] = -s * scale;
            h[(k + 1, k - 1)] = T::zero();
            if three {
                h[(k + 2, k - 1)] = T::zero();
            }
        } else if l != start {
            h[(k, k - 1)] = -h[(k, k - 1)];
        }
        p = p + s;
        let reflector = BulgeReflector {
            k,
            x: p / s,
            y: q / s,
            z: r / s,
            q: q / p,
            r: r / p,
            three,
        };

        reflector.apply_rows(h, k..n);
        reflector.apply_columns(h, 0..m.min(k + 3) + 1);
        reflector.apply_columns(accumulator, 0..n);
    }
}

/// Finish a Schur decomposition from upper Hessenberg form.
///
/// `h` must be upper Hessenberg (entries below the first sub-diagonal are
/// zero). On return it holds the quasi-upper-triangular Schur form, and
/// `accumulator`, holding `B` on entry, holds `B·Q`. With
/// `want_eigenvectors` the Schur form is consumed by back-substitution and
/// `accumulator` ends up holding `B` times the eigenvector basis instead
/// (see [`DenseEigen`](crate::DenseEigen) for the column layout).
///
/// Eigenvalues are returned in diagonal order; complex pairs occupy two
/// consecutive slots with the positive imaginary part first.
pub fn schur_in_place<T: FloatScalar>(
    h: &mut DenseMatrix<T>,
    accumulator: &mut DenseMatrix<T>,
    want_eigenvectors: bool,
    options: &SchurOptions,
) -> Result<Vec<Complex<T>>> {
    check_pair(h, accumulator)?;
    let spectrum = reduce_to_schur(h, accumulator, options)?;
    if want_eigenvectors && spectrum.norm1 != T::zero() {
        back_substitute(h, accumulator, &spectrum)?;
    }
    Ok(spectrum.values())
}

/// Compute the eigenvalues of a square matrix in place, with the default
/// iteration cap for its order.
///
/// `matrix` is reduced to Hessenberg form and then to real Schur form;
/// `accumulator` collects every similarity transform applied (start from
/// the identity to get the Schur vectors). Both buffers are destroyed.
///
/// ```
/// use densestore::{compute_in_place_schur, Complex, DenseMatrix};
///
/// let mut a = DenseMatrix::from_rows(2, 2, &[0.0, -1.0, 1.0, 0.0]).unwrap();
/// let mut v = DenseMatrix::identity(2);
/// let values = compute_in_place_schur(&mut a, &mut v, false).unwrap();
/// assert_eq!(values, vec![Complex::new(0.0, 1.0), Complex::new(0.0, -1.0)]);
/// ```
pub fn compute_in_place_schur<T: FloatScalar>(
    matrix: &mut DenseMatrix<T>,
    accumulator: &mut DenseMatrix<T>,
    want_eigenvectors: bool,
) -> Result<Vec<Complex<T>>> {
    let options = SchurOptions::for_order(matrix.nrows());
    compute_in_place_schur_with(matrix, accumulator, want_eigenvectors, &options)
}

/// [`compute_in_place_schur`] with explicit options.
pub fn compute_in_place_schur_with<T: FloatScalar>(
    matrix: &mut DenseMatrix<T>,
    accumulator: &mut DenseMatrix<T>,
    want_eigenvectors: bool,
    options: &SchurOptions,
) -> Result<Vec<Complex<T>>> {
    hessenberg(matrix, accumulator)?;
    schur_in_place(matrix, accumulator, want_eigenvectors, options)
}
