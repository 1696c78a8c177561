//! Fork-join dispatcher used by every parallel-capable kernel.
//!
//! A kernel describes its work as a range of independent units (columns,
//! rows of a scratch vector, plain indices) together with the mutable state
//! those units own. [`divide_and_conquer`] runs the kernel inline when the
//! unit count is at or below the kernel's threshold, and otherwise halves the
//! state and recurses on both halves through [`rayon::join`]. The calling
//! thread blocks until every half has returned.
//!
//! State is split through [`Divisible`], which only ever hands out disjoint
//! borrows, so partitions cannot observe each other's writes. Reductions go
//! through [`reduce`], which merges partial results under a mutex.
//!
//! Thresholds only affect performance. The kernels evaluate every output
//! element with the same operation order whether they run serially or not.

use core::cell::Cell;
use core::ops::Range;

use parking_lot::{const_rwlock, Mutex, RwLock};

/// The kind of kernel, used to look up its dispatch threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelKind {
    /// Fill and copy kernels (`fill_all`, `fill_matching`, `fill_with`).
    Fill,
    /// Per-element transforms and `maxpy`.
    Modify,
    /// Reductions (`aggregate_all`).
    Aggregate,
    /// Dense products.
    Multiply,
    /// Householder applications and QR bulge-chase sweeps.
    Householder,
    /// Givens rotations.
    Rotation,
    /// LU / Cholesky elimination steps.
    Elimination,
    /// Forward / backward substitution.
    Substitution,
}

/// Per-kernel unit counts above which a kernel is split across threads.
///
/// A threshold of `0` splits down to single units; `usize::MAX` never
/// splits.
///
/// ```
/// use densestore::parallel::{KernelKind, Thresholds};
///
/// let t = Thresholds::default();
/// assert!(t.get(KernelKind::Multiply) > 0);
/// assert_eq!(Thresholds::eager().get(KernelKind::Fill), 0);
/// assert_eq!(Thresholds::serial().get(KernelKind::Fill), usize::MAX);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub fill: usize,
    pub modify: usize,
    pub aggregate: usize,
    pub multiply: usize,
    pub householder: usize,
    pub rotation: usize,
    pub elimination: usize,
    pub substitution: usize,
}

impl Thresholds {
    /// Library defaults, in units of columns (or rows for row-block kernels).
    pub const DEFAULT: Thresholds = Thresholds {
        fill: 256,
        modify: 256,
        aggregate: 256,
        multiply: 32,
        householder: 128,
        rotation: 512,
        elimination: 64,
        substitution: 64,
    };

    /// Never split: every kernel runs on the calling thread.
    pub const fn serial() -> Self {
        Self::uniform(usize::MAX)
    }

    /// Always split down to single units.
    pub const fn eager() -> Self {
        Self::uniform(0)
    }

    /// The same threshold for every kernel kind.
    pub const fn uniform(value: usize) -> Self {
        Thresholds {
            fill: value,
            modify: value,
            aggregate: value,
            multiply: value,
            householder: value,
            rotation: value,
            elimination: value,
            substitution: value,
        }
    }

    /// Threshold for one kernel kind.
    pub fn get(&self, kind: KernelKind) -> usize {
        match kind {
            KernelKind::Fill => self.fill,
            KernelKind::Modify => self.modify,
            KernelKind::Aggregate => self.aggregate,
            KernelKind::Multiply => self.multiply,
            KernelKind::Householder => self.householder,
            KernelKind::Rotation => self.rotation,
            KernelKind::Elimination => self.elimination,
            KernelKind::Substitution => self.substitution,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

static GLOBAL_THRESHOLDS: RwLock<Thresholds> = const_rwlock(Thresholds::DEFAULT);

thread_local! {
    static SCOPED_THRESHOLDS: Cell<Option<Thresholds>> = const { Cell::new(None) };
}

/// The thresholds in effect on the calling thread.
pub fn thresholds() -> Thresholds {
    SCOPED_THRESHOLDS
        .with(Cell::get)
        .unwrap_or_else(|| *GLOBAL_THRESHOLDS.read())
}

/// Threshold for one kernel kind on the calling thread.
#[inline]
pub fn threshold(kind: KernelKind) -> usize {
    thresholds().get(kind)
}

/// Replace the process-wide default thresholds.
pub fn set_thresholds(thresholds: Thresholds) {
    log::debug!(target: "densestore::parallel", "process thresholds set to {thresholds:?}");
    *GLOBAL_THRESHOLDS.write() = thresholds;
}

/// Run `f` with `thresholds` in effect for kernels started on this thread.
///
/// The previous setting is restored when `f` returns or unwinds. Kernels
/// read their threshold once on entry, so worker threads never need the
/// override.
///
/// ```
/// use densestore::parallel::{self, KernelKind, Thresholds};
///
/// let inside = parallel::with_thresholds(Thresholds::eager(), || {
///     parallel::threshold(KernelKind::Multiply)
/// });
/// assert_eq!(inside, 0);
/// assert_eq!(
///     parallel::threshold(KernelKind::Multiply),
///     parallel::thresholds().multiply
/// );
/// ```
pub fn with_thresholds<R>(thresholds: Thresholds, f: impl FnOnce() -> R) -> R {
    struct Restore(Option<Thresholds>);

    impl Drop for Restore {
        fn drop(&mut self) {
            SCOPED_THRESHOLDS.with(|c| c.set(self.0));
        }
    }

    let _restore = Restore(SCOPED_THRESHOLDS.with(|c| c.replace(Some(thresholds))));
    f()
}

/// State that can be split into two disjoint halves by unit index.
pub trait Divisible: Sized + Send {
    /// Number of units owned by this piece of state.
    fn units(&self) -> usize;

    /// Split into `[0, mid)` and `[mid, units)`.
    fn divide_at(self, mid: usize) -> (Self, Self);
}

/// Plain index ranges, for read-only kernels.
impl Divisible for Range<usize> {
    #[inline]
    fn units(&self) -> usize {
        self.len()
    }

    #[inline]
    fn divide_at(self, mid: usize) -> (Self, Self) {
        let split = self.start + mid;
        (self.start..split, split..self.end)
    }
}

/// Element-wise slices, e.g. row blocks of a scratch vector.
impl<T: Send> Divisible for &mut [T] {
    #[inline]
    fn units(&self) -> usize {
        self.len()
    }

    #[inline]
    fn divide_at(self, mid: usize) -> (Self, Self) {
        self.split_at_mut(mid)
    }
}

/// Two pieces of state split in lockstep.
impl<A: Divisible, B: Divisible> Divisible for (A, B) {
    #[inline]
    fn units(&self) -> usize {
        debug_assert_eq!(self.0.units(), self.1.units());
        self.0.units()
    }

    #[inline]
    fn divide_at(self, mid: usize) -> (Self, Self) {
        let (a0, a1) = self.0.divide_at(mid);
        let (b0, b1) = self.1.divide_at(mid);
        ((a0, b0), (a1, b1))
    }
}

/// A block of whole columns of column-major storage.
///
/// Splitting happens on column boundaries, so each partition owns its
/// columns outright.
#[derive(Debug)]
pub struct Columns<'a, T> {
    data: &'a mut [T],
    nrows: usize,
    ncols: usize,
}

impl<'a, T> Columns<'a, T> {
    /// Wrap `data`, which must hold exactly `ncols` columns of `nrows` rows.
    pub fn new(data: &'a mut [T], nrows: usize, ncols: usize) -> Self {
        assert_eq!(data.len(), nrows * ncols, "column block size mismatch");
        Self { data, nrows, ncols }
    }

    /// Number of rows per column.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns in this block.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Column `local` of this block (0-based within the block).
    #[inline]
    pub fn col_mut(&mut self, local: usize) -> &mut [T] {
        let start = local * self.nrows;
        &mut self.data[start..start + self.nrows]
    }
}

impl<T: Send> Divisible for Columns<'_, T> {
    #[inline]
    fn units(&self) -> usize {
        self.ncols
    }

    #[inline]
    fn divide_at(self, mid: usize) -> (Self, Self) {
        let (lo, hi) = self.data.split_at_mut(mid * self.nrows);
        (
            Columns {
                data: lo,
                nrows: self.nrows,
                ncols: mid,
            },
            Columns {
                data: hi,
                nrows: self.nrows,
                ncols: self.ncols - mid,
            },
        )
    }
}

/// Run `conquer(first, piece)` over `state`, inline or split in halves.
///
/// `first` is the absolute index of the first unit of `state`; each call
/// of `conquer` receives the absolute index of its own first unit. A piece
/// with a single unit is never split further.
pub fn divide_and_conquer<D, F>(first: usize, state: D, threshold: usize, conquer: &F)
where
    D: Divisible,
    F: Fn(usize, D) + Sync,
{
    let units = state.units();
    if units <= threshold.max(1) {
        conquer(first, state);
        return;
    }
    let mid = units / 2;
    let (lo, hi) = state.divide_at(mid);
    rayon::join(
        || divide_and_conquer(first, lo, threshold, conquer),
        || divide_and_conquer(first + mid, hi, threshold, conquer),
    );
}

/// [`divide_and_conquer`] with the calling thread's threshold for `kind`.
pub fn dispatch<D, F>(kind: KernelKind, first: usize, state: D, conquer: &F)
where
    D: Divisible,
    F: Fn(usize, D) + Sync,
{
    let threshold = threshold(kind);
    let units = state.units();
    if units > threshold.max(1) {
        log::trace!(
            target: "densestore::parallel",
            "{kind:?}: splitting {units} units (threshold {threshold})"
        );
    }
    divide_and_conquer(first, state, threshold, conquer);
}

/// Reduce `range` with `part` over each partition and `merge` across them.
///
/// Partial results are merged into one shared accumulator under a mutex, so
/// `merge` must be associative and commutative for the result to be
/// independent of scheduling (up to floating-point rounding).
pub fn reduce<R, P, M>(kind: KernelKind, range: Range<usize>, identity: R, part: P, merge: M) -> R
where
    R: Copy + Send,
    P: Fn(Range<usize>) -> R + Sync,
    M: Fn(R, R) -> R + Sync,
{
    let total = Mutex::new(identity);
    let first = range.start;
    dispatch(kind, first, range, &|_, piece: Range<usize>| {
        let partial = part(piece);
        let mut guard = total.lock();
        *guard = merge(*guard, partial);
    });
    total.into_inner()
}
