//! Orthogonal plane transforms: Householder reflections and Givens
//! rotations applied to a [`DenseMatrix`](crate::DenseMatrix) in place.

mod householder;
mod rotation;

pub use householder::{householder_left, householder_right, householder_symmetric, Householder};
pub use rotation::{rotate_columns, rotate_rows, Rotation};

pub(crate) use rotation::two_columns_mut;
