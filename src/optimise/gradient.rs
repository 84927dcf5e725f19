use std::fmt;

use serde::{Deserialize, Serialize};

use super::Tolerances;
use crate::{
    OptimErr, Result,
    algodiff::{
        Value,
        maths::{add, div, l2norm_sqr, mul, neg, sub, sum},
    },
};

/// The rule that turns a gradient into a descent direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(clippy::upper_case_acronyms)]
pub enum Gradient {
    /// Plain gradient descent.
    #[default]
    #[serde(rename = "gd")]
    GD,
    /// Conjugate gradient, Hestenes-Stiefel.
    #[serde(rename = "cg")]
    CG,
    /// Fletcher's conjugate descent.
    #[serde(rename = "cd")]
    CD,
    /// Nonlinear conjugate gradient, Fletcher-Reeves.
    #[serde(rename = "nonlinear_cg")]
    NonlinearCG,
    #[serde(rename = "dai_yuan_cg")]
    DaiYuanCG,
    #[serde(rename = "newton_cg")]
    NewtonCG,
    Newton,
}

impl Gradient {
    /// Computes the next descent direction.
    ///
    /// # Arguments
    /// * `loss_fn` - The objective being minimised, needed by second order rules.
    /// * `w` - The current weights, needed by second order rules.
    /// * `g` - The previous gradient.
    /// * `p` - The previous direction.
    /// * `g_new` - The current gradient.
    ///
    /// # Returns
    /// The new direction or an error if the rule is not implemented.
    pub fn run(
        &self,
        loss_fn: &dyn Fn(&Value) -> Result<Value>,
        w: &Value,
        g: &Value,
        p: &Value,
        g_new: &Value,
    ) -> Result<Value> {
        self.run_with(&Tolerances::default(), loss_fn, w, g, p, g_new)
    }

    /// Same as `run`, with the Hestenes-Stiefel epsilon taken from `tol`.
    pub fn run_with(
        &self,
        tol: &Tolerances,
        _loss_fn: &dyn Fn(&Value) -> Result<Value>,
        _w: &Value,
        g: &Value,
        p: &Value,
        g_new: &Value,
    ) -> Result<Value> {
        let beta = match self {
            Gradient::GD => return neg(g_new),
            Gradient::CG => {
                let y = sub(g_new, g)?;
                let den = add(&sum(&mul(p, &y)?)?, &Value::Scalar(tol.conjugate))?;
                div(&sum(&mul(g_new, &y)?)?, &den)?
            }
            Gradient::CD => {
                let den = sum(&mul(&neg(p)?, g)?)?;
                div(&l2norm_sqr(g_new)?, &den)?
            }
            Gradient::NonlinearCG => div(&l2norm_sqr(g_new)?, &l2norm_sqr(g)?)?,
            Gradient::DaiYuanCG => {
                let y = sub(g_new, g)?;
                div(&l2norm_sqr(g_new)?, &sum(&mul(p, &y)?)?)?
            }
            Gradient::NewtonCG => {
                return Err(OptimErr::NotImplemented {
                    what: "newton conjugate gradient",
                });
            }
            Gradient::Newton => return Err(OptimErr::NotImplemented { what: "newton" }),
        };

        add(&neg(g_new)?, &mul(&beta, p)?)
    }

    /// Returns the same variant, directions take no parameters.
    pub fn with_defaults(&self) -> Self {
        *self
    }
}

impl fmt::Display for Gradient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gradient::GD => write!(f, "gradient descent"),
            Gradient::CG => write!(f, "conjugate gradient"),
            Gradient::CD => write!(f, "conjugate descent"),
            Gradient::NonlinearCG => write!(f, "nonlinear conjugate gradient"),
            Gradient::DaiYuanCG => write!(f, "dai & yuan conjugate gradient"),
            Gradient::NewtonCG => write!(f, "newton conjugate gradient"),
            Gradient::Newton => write!(f, "newton"),
        }
    }
}
