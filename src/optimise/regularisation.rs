use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    Result,
    algodiff::{
        Value,
        maths::{add, l1norm, l2norm_sqr, mul},
    },
};

/// A penalty on the size of the weights, added to the loss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regularisation {
    L1norm(f64),
    L2norm(f64),
    /// `ElasticNet(a, b)`, a mix of the l1 and the squared l2 penalties.
    ElasticNet(f64, f64),
    #[default]
    None,
}

impl Regularisation {
    /// Returns the penalty of the weights `w`.
    pub fn run(&self, w: &Value) -> Result<Value> {
        match *self {
            Regularisation::L1norm(a) => mul(&Value::Scalar(a), &l1norm(w)?),
            Regularisation::L2norm(a) => mul(&Value::Scalar(a), &l2norm_sqr(w)?),
            Regularisation::ElasticNet(a, b) => add(
                &mul(&Value::Scalar(a), &l1norm(w)?)?,
                &mul(&Value::Scalar(b), &l2norm_sqr(w)?)?,
            ),
            Regularisation::None => Ok(Value::Scalar(0.0)),
        }
    }

    /// Returns the same variant with its canonical parameters.
    pub fn with_defaults(&self) -> Self {
        match self {
            Regularisation::L1norm(_) => Regularisation::L1norm(0.001),
            Regularisation::L2norm(_) => Regularisation::L2norm(0.001),
            Regularisation::ElasticNet(..) => Regularisation::ElasticNet(0.001, 0.001),
            Regularisation::None => Regularisation::None,
        }
    }
}

impl fmt::Display for Regularisation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regularisation::L1norm(a) => write!(f, "l1norm (a = {a})"),
            Regularisation::L2norm(a) => write!(f, "l2norm (a = {a})"),
            Regularisation::ElasticNet(a, b) => write!(f, "elastic net (a = {a}, b = {b})"),
            Regularisation::None => write!(f, "none"),
        }
    }
}
