use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    Result,
    algodiff::{
        Value,
        maths::{add, mul},
    },
};

/// Blends the previous update into the current one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Momentum {
    Standard(f64),
    Nesterov(f64),
    #[default]
    None,
}

impl Momentum {
    /// Returns the update to apply.
    ///
    /// # Arguments
    /// * `u` - The previous update, also known as the velocity.
    /// * `u_new` - The update computed in this iteration.
    pub fn run(&self, u: &Value, u_new: &Value) -> Result<Value> {
        match *self {
            Momentum::Standard(m) => add(&mul(&Value::Scalar(m), u)?, u_new),
            Momentum::Nesterov(m) => add(
                &mul(&Value::Scalar(m * m), u)?,
                &mul(&Value::Scalar(m + 1.0), u_new)?,
            ),
            Momentum::None => Ok(u_new.clone()),
        }
    }

    /// Returns the same variant with its canonical parameters.
    pub fn with_defaults(&self) -> Self {
        match self {
            Momentum::Standard(_) => Momentum::Standard(0.9),
            Momentum::Nesterov(_) => Momentum::Nesterov(0.9),
            Momentum::None => Momentum::None,
        }
    }
}

impl fmt::Display for Momentum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Momentum::Standard(m) => write!(f, "standard (m = {m})"),
            Momentum::Nesterov(m) => write!(f, "nesterov (m = {m})"),
            Momentum::None => write!(f, "none"),
        }
    }
}
