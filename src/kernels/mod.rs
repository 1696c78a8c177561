//! Data-parallel kernels over [`DenseMatrix`](crate::DenseMatrix).
//!
//! Each kernel is an inherent method on `DenseMatrix` and routes its work
//! through the [`parallel`](crate::parallel) dispatcher under its own
//! [`KernelKind`](crate::parallel::KernelKind) threshold.

mod elementwise;
mod elimination;
mod multiply;

pub use elementwise::Aggregator;
