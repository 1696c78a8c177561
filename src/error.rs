//! Error type shared by every fallible operation in the crate.
//!
//! Shape problems are detected up front, before any buffer is touched, so an
//! `Err` always leaves the caller's matrices unchanged. Numerical
//! near-singularity is not an error: the kernels substitute epsilon-scaled
//! denominators instead.
use thiserror::Error;

/// Result type alias using densestore's [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

/// Errors returned by matrix construction, kernels and the eigen pipeline.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A flat value sequence or an operand has incompatible dimensions.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected `(rows, cols)`.
        expected: (usize, usize),
        /// Got `(rows, cols)`.
        got: (usize, usize),
    },

    /// The operation requires a square matrix.
    #[error("matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    /// A checked accessor was given an index outside the matrix.
    #[error("index ({row}, {col}) out of range for {rows}x{cols} matrix")]
    OutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// The shifted QR iteration exceeded its iteration cap.
    #[error("QR iteration did not converge after {iterations} iterations")]
    NoConvergence { iterations: usize },
}

impl Error {
    pub(crate) fn shape(expected: (usize, usize), got: (usize, usize)) -> Self {
        Error::ShapeMismatch { expected, got }
    }
}
