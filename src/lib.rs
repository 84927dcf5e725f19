//! Gradient based optimisation driven by forward-mode differentiation.
//!
//! `algodiff` provides the differentiable `Value` type and its operators, `optimise` the
//! pluggable training strategies and the loop that ties them together.

pub mod algodiff;
pub mod error;
pub mod optimise;

pub use error::{OptimErr, Result};
