//! Non-symmetric eigenvalue pipeline.
//!
//! [`hessenberg`] reduces a square matrix by Householder similarities,
//! [`schur_in_place`] runs the Francis double-shift QR iteration on the
//! result, and back-substitution turns the Schur form into eigenvectors.
//! [`compute_in_place_schur`] chains the three on caller-owned buffers;
//! [`DenseEigen`] does the same on copies and keeps the pieces.
//!
//! The in-place entry points are destructive: clone first if the input is
//! still needed.

mod eigen;
mod eigenvectors;
mod hessenberg;
mod schur;

pub use eigen::DenseEigen;
pub use hessenberg::hessenberg;
pub use schur::{compute_in_place_schur, compute_in_place_schur_with, schur_in_place, SchurOptions};
