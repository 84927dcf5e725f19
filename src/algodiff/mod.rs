//! Forward-mode algorithmic differentiation over dual numbers.

pub mod backend;
mod diff;
pub mod maths;
mod value;

pub use diff::{diff, diff_, grad, grad_, jvp};
pub use value::{Value, dual, is_const, is_zero, one, sign, value, zero};
