use core::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::traits::Scalar;

use super::DenseMatrix;

// Operators panic on shape mismatch, like slice arithmetic. The fallible
// forms are `fill_with`, `modify_matching` and `multiply`.

fn assert_same_shape<T>(lhs: &DenseMatrix<T>, rhs: &DenseMatrix<T>, op: &str) {
    assert_eq!(
        (lhs.nrows, lhs.ncols),
        (rhs.nrows, rhs.ncols),
        "dimension mismatch: {}x{} {op} {}x{}",
        lhs.nrows,
        lhs.ncols,
        rhs.nrows,
        rhs.ncols,
    );
}

impl<T: Scalar> DenseMatrix<T> {
    fn combined(&self, rhs: &Self, op: impl Fn(T, T) -> T + Sync, symbol: &str) -> Self {
        assert_same_shape(self, rhs, symbol);
        let mut out = Self::zeros(self.nrows, self.ncols);
        out.fill_with(self, op, rhs)
            .unwrap_or_else(|e| panic!("{e}"));
        out
    }

    fn combine_assign(&mut self, rhs: &Self, op: impl Fn(T, T) -> T + Sync, symbol: &str) {
        assert_same_shape(self, rhs, symbol);
        self.modify_matching(op, rhs)
            .unwrap_or_else(|e| panic!("{e}"));
    }
}

// ── Element-wise addition / subtraction ─────────────────────────────

macro_rules! impl_elementwise_op {
    ($Op:ident, $op:ident, $OpAssign:ident, $op_assign:ident, $sym:literal) => {
        impl<T: Scalar> $Op<&DenseMatrix<T>> for &DenseMatrix<T> {
            type Output = DenseMatrix<T>;
            fn $op(self, rhs: &DenseMatrix<T>) -> DenseMatrix<T> {
                self.combined(rhs, |a, b| a.$op(b), $sym)
            }
        }

        impl<T: Scalar> $Op<&DenseMatrix<T>> for DenseMatrix<T> {
            type Output = DenseMatrix<T>;
            fn $op(mut self, rhs: &DenseMatrix<T>) -> DenseMatrix<T> {
                self.combine_assign(rhs, |a, b| a.$op(b), $sym);
                self
            }
        }

        impl<T: Scalar> $Op<DenseMatrix<T>> for &DenseMatrix<T> {
            type Output = DenseMatrix<T>;
            fn $op(self, rhs: DenseMatrix<T>) -> DenseMatrix<T> {
                self.combined(&rhs, |a, b| a.$op(b), $sym)
            }
        }

        impl<T: Scalar> $Op for DenseMatrix<T> {
            type Output = Self;
            fn $op(self, rhs: Self) -> Self {
                self.$op(&rhs)
            }
        }

        impl<T: Scalar> $OpAssign<&DenseMatrix<T>> for DenseMatrix<T> {
            fn $op_assign(&mut self, rhs: &DenseMatrix<T>) {
                self.combine_assign(rhs, |a, b| a.$op(b), concat!($sym, "="));
            }
        }

        impl<T: Scalar> $OpAssign for DenseMatrix<T> {
            fn $op_assign(&mut self, rhs: Self) {
                self.$op_assign(&rhs);
            }
        }
    };
}

impl_elementwise_op!(Add, add, AddAssign, add_assign, "+");
impl_elementwise_op!(Sub, sub, SubAssign, sub_assign, "-");

// ── Negation ────────────────────────────────────────────────────────

impl<T: Scalar> Neg for DenseMatrix<T> {
    type Output = Self;

    fn neg(mut self) -> Self {
        self.modify_all(|x| T::zero() - x);
        self
    }
}

impl<T: Scalar> Neg for &DenseMatrix<T> {
    type Output = DenseMatrix<T>;

    fn neg(self) -> DenseMatrix<T> {
        -self.clone()
    }
}

// ── Matrix multiplication: (M×N) * (N×P) → (M×P) ──────────────────

impl<T: Scalar> Mul<&DenseMatrix<T>> for &DenseMatrix<T> {
    type Output = DenseMatrix<T>;

    fn mul(self, rhs: &DenseMatrix<T>) -> DenseMatrix<T> {
        assert_eq!(
            self.ncols, rhs.nrows,
            "dimension mismatch: {}x{} * {}x{}",
            self.nrows, self.ncols, rhs.nrows, rhs.ncols,
        );
        self.multiply(rhs).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<T: Scalar> Mul<&DenseMatrix<T>> for DenseMatrix<T> {
    type Output = DenseMatrix<T>;
    fn mul(self, rhs: &DenseMatrix<T>) -> DenseMatrix<T> {
        &self * rhs
    }
}

impl<T: Scalar> Mul<DenseMatrix<T>> for &DenseMatrix<T> {
    type Output = DenseMatrix<T>;
    fn mul(self, rhs: DenseMatrix<T>) -> DenseMatrix<T> {
        self * &rhs
    }
}

impl<T: Scalar> Mul for DenseMatrix<T> {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        &self * &rhs
    }
}

// ── Scalar multiplication / division ────────────────────────────────

impl<T: Scalar> Mul<T> for DenseMatrix<T> {
    type Output = Self;

    fn mul(mut self, rhs: T) -> Self {
        self *= rhs;
        self
    }
}

impl<T: Scalar> Mul<T> for &DenseMatrix<T> {
    type Output = DenseMatrix<T>;

    fn mul(self, rhs: T) -> DenseMatrix<T> {
        self.clone() * rhs
    }
}

impl<T: Scalar> MulAssign<T> for DenseMatrix<T> {
    fn mul_assign(&mut self, rhs: T) {
        self.modify_all(|x| x * rhs);
    }
}

impl<T: Scalar> Div<T> for DenseMatrix<T> {
    type Output = Self;

    fn div(mut self, rhs: T) -> Self {
        self /= rhs;
        self
    }
}

impl<T: Scalar> Div<T> for &DenseMatrix<T> {
    type Output = DenseMatrix<T>;

    fn div(self, rhs: T) -> DenseMatrix<T> {
        self.clone() / rhs
    }
}

impl<T: Scalar> DivAssign<T> for DenseMatrix<T> {
    fn div_assign(&mut self, rhs: T) {
        self.modify_all(|x| x / rhs);
    }
}

macro_rules! impl_scalar_lhs_mul {
    ($($t:ty),*) => {
        $(
            impl Mul<DenseMatrix<$t>> for $t {
                type Output = DenseMatrix<$t>;
                fn mul(self, rhs: DenseMatrix<$t>) -> DenseMatrix<$t> {
                    rhs * self
                }
            }

            impl Mul<&DenseMatrix<$t>> for $t {
                type Output = DenseMatrix<$t>;
                fn mul(self, rhs: &DenseMatrix<$t>) -> DenseMatrix<$t> {
                    rhs * self
                }
            }
        )*
    };
}

impl_scalar_lhs_mul!(f32, f64);
