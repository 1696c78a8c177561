//! # densestore
//!
//! Column-major dense matrix storage with fork-join data-parallel kernels and
//! a real non-symmetric eigenvalue engine (Hessenberg reduction followed by
//! the Francis double-shift QR iteration).
//!
//! ## Quick start
//!
//! ```
//! use densestore::{DenseMatrix, Complex};
//!
//! let a = DenseMatrix::from_rows(3, 3, &[
//!     2.0_f64, 0.0, 0.0,
//!     0.0, 0.0, -1.0,
//!     0.0, 1.0, 0.0,
//! ]).unwrap();
//!
//! let eig = a.eigen().unwrap();
//! assert!(eig.eigenvalues().contains(&Complex::new(0.0, 1.0)));
//! assert!(eig.eigenvalues().contains(&Complex::new(2.0, 0.0)));
//! ```
//!
//! ## Modules
//!
//! - [`dense`] — [`DenseMatrix<T>`], a `Vec<T>` in column-major order with
//!   runtime dimensions, plus the lazy [`Transposed`] view and the
//!   [`Operand`] wrapper the multiply kernel dispatches on. Arithmetic
//!   operators, norms and `Display`.
//!
//! - [`kernels`] — Elementwise fills, modifies and [`Aggregator`]
//!   reductions; matrix multiplication; LU/Cholesky elimination steps and
//!   triangular substitution. All implemented as inherent methods on
//!   `DenseMatrix`.
//!
//! - [`transform`] — Householder reflectors and Givens rotations applied
//!   from the left or right, in parallel over columns.
//!
//! - [`linalg`] — [`hessenberg`], [`schur_in_place`],
//!   [`compute_in_place_schur`] and the owning [`DenseEigen`].
//!
//! - [`parallel`] — The divide-and-conquer dispatcher. Every kernel runs
//!   inline below its [`Thresholds`](parallel::Thresholds) entry and splits
//!   in halves through `rayon::join` above it.
//!
//! - [`traits`] — Element trait hierarchy:
//!   - [`Scalar`] — all matrix elements (`Copy + PartialEq + Debug + Zero + One + Num`)
//!   - [`FloatScalar`] — real floats (`Scalar + Float`), used by norms,
//!     transforms and the eigen pipeline
//!   - [`MatrixRef`] / [`MatrixMut`] — generic read/write access
//!
//! ## Errors and logging
//!
//! Fallible operations return [`Result<T>`] with [`Error`]. Shape checks run
//! before any buffer is mutated. The crate logs through the `log` facade
//! (targets `densestore::parallel`, `densestore::hessenberg`,
//! `densestore::schur`) and never installs a logger.

pub mod dense;
pub mod error;
pub mod kernels;
pub mod linalg;
pub mod parallel;
pub mod traits;
pub mod transform;

pub use dense::{DenseMatrix, Operand, Transposed};
pub use error::{Error, Result};
pub use kernels::Aggregator;
pub use linalg::{
    compute_in_place_schur, compute_in_place_schur_with, hessenberg, schur_in_place, DenseEigen,
    SchurOptions,
};
pub use num_complex::Complex;
pub use traits::{FloatScalar, MatrixMut, MatrixRef, Scalar};
