use std::fmt;

use serde::{Deserialize, Serialize};

use super::Tolerances;
use crate::{
    OptimErr, Result,
    algodiff::{
        Value,
        maths::{add, div, mul, sqr, sqrt},
    },
};

/// The length of the step taken along the descent direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningRate {
    /// `Adagrad(a)`, scaled by the accumulated squared gradients.
    Adagrad(f64),
    Const(f64),
    /// `Decay(a, k)`, that is, `a / (1 + k * i)`.
    Decay(f64, f64),
    /// `ExpDecay(a, k)`, that is, `a * exp(-k * i)`.
    ExpDecay(f64, f64),
    /// `RMSprop(a, k)`, scaled by a moving average of the squared gradients.
    #[serde(rename = "rmsprop")]
    RMSprop(f64, f64),
    /// A fixed sequence of rates, cycled through.
    Schedule(Vec<f64>),
}

impl LearningRate {
    /// Returns the learning rate of iteration `i`.
    ///
    /// # Arguments
    /// * `i` - The iteration number.
    /// * `_g` - The current gradient.
    /// * `c` - The gradient accumulator, as advanced by `update_ch`.
    pub fn run(&self, i: usize, g: &Value, c: &Value) -> Result<Value> {
        self.run_with(&Tolerances::default(), i, g, c)
    }

    /// Same as `run`, with the epsilons of the adaptive rates taken from `tol`.
    pub fn run_with(&self, tol: &Tolerances, i: usize, _g: &Value, c: &Value) -> Result<Value> {
        let t = i as f64;

        match self {
            LearningRate::Adagrad(a) => {
                div(&Value::Scalar(*a), &sqrt(&add(c, &Value::Scalar(tol.adagrad))?)?)
            }
            LearningRate::Const(a) => Ok(Value::Scalar(*a)),
            LearningRate::Decay(a, k) => Ok(Value::Scalar(a / (1.0 + k * t))),
            LearningRate::ExpDecay(a, k) => Ok(Value::Scalar(a * (-k * t).exp())),
            LearningRate::RMSprop(a, _) => {
                div(&Value::Scalar(*a), &sqrt(&add(c, &Value::Scalar(tol.rmsprop))?)?)
            }
            LearningRate::Schedule(s) if s.is_empty() => {
                Err(OptimErr::InvalidInput("the learning rate schedule is empty"))
            }
            LearningRate::Schedule(s) => Ok(Value::Scalar(s[i % s.len()])),
        }
    }

    /// Advances the gradient accumulator.
    ///
    /// # Arguments
    /// * `g` - The current gradient.
    /// * `c` - The previous accumulator.
    ///
    /// # Returns
    /// The new accumulator.
    pub fn update_ch(&self, g: &Value, c: &Value) -> Result<Value> {
        match self {
            LearningRate::Adagrad(_) => add(c, &sqr(g)?),
            LearningRate::RMSprop(_, k) => add(
                &mul(&Value::Scalar(*k), c)?,
                &mul(&Value::Scalar(1.0 - k), &sqr(g)?)?,
            ),
            _ => Ok(c.clone()),
        }
    }

    /// Returns the same variant with its canonical parameters.
    pub fn with_defaults(&self) -> Self {
        match self {
            LearningRate::Adagrad(_) => LearningRate::Adagrad(0.01),
            LearningRate::Const(_) => LearningRate::Const(0.001),
            LearningRate::Decay(..) => LearningRate::Decay(0.1, 0.1),
            LearningRate::ExpDecay(..) => LearningRate::ExpDecay(1.0, 0.1),
            LearningRate::RMSprop(..) => LearningRate::RMSprop(0.001, 0.9),
            LearningRate::Schedule(_) => LearningRate::Schedule(vec![0.001]),
        }
    }
}

impl Default for LearningRate {
    fn default() -> Self {
        LearningRate::Const(0.0)
    }
}

impl fmt::Display for LearningRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LearningRate::Adagrad(a) => write!(f, "adagrad (a = {a})"),
            LearningRate::Const(a) => write!(f, "constant (a = {a})"),
            LearningRate::Decay(a, k) => write!(f, "decay (a = {a}, k = {k})"),
            LearningRate::ExpDecay(a, k) => write!(f, "exp_decay (a = {a}, k = {k})"),
            LearningRate::RMSprop(a, k) => write!(f, "rmsprop (a = {a}, k = {k})"),
            LearningRate::Schedule(s) => write!(f, "schedule (len = {})", s.len()),
        }
    }
}
