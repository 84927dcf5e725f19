use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    Result,
    algodiff::{
        Value,
        maths::{l1norm, l2norm, l2norm_sqr, log, mul, neg, relu, sub, sum},
    },
};

/// A user supplied loss, called with the targets and the predictions.
pub type LossFn = Arc<dyn Fn(&Value, &Value) -> Result<Value> + Send + Sync>;

/// Measures the difference between a model's output and the expected one.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    Hinge,
    L1norm,
    L2norm,
    Quadratic,
    #[default]
    CrossEntropy,
    #[serde(skip)]
    Custom(LossFn),
}

impl Loss {
    /// Computes the loss of a prediction.
    ///
    /// # Arguments
    /// * `y` - The expected output.
    /// * `y_pred` - The model's output.
    ///
    /// # Returns
    /// A scalar value carrying the derivatives of `y_pred`.
    pub fn run(&self, y: &Value, y_pred: &Value) -> Result<Value> {
        match self {
            Loss::Hinge => sum(&relu(&sub(&Value::Scalar(1.0), &mul(y, y_pred)?)?)?),
            Loss::L1norm => l1norm(&sub(y, y_pred)?),
            Loss::L2norm => l2norm(&sub(y, y_pred)?),
            Loss::Quadratic => l2norm_sqr(&sub(y, y_pred)?),
            Loss::CrossEntropy => neg(&sum(&mul(y, &log(y_pred)?)?)?),
            Loss::Custom(f) => f(y, y_pred),
        }
    }

    /// Returns the same variant, losses take no parameters.
    pub fn with_defaults(&self) -> Self {
        self.clone()
    }
}

impl PartialEq for Loss {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Loss::Custom(a), Loss::Custom(b)) => Arc::ptr_eq(a, b),
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl fmt::Debug for Loss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Loss::Hinge => write!(f, "Hinge"),
            Loss::L1norm => write!(f, "L1norm"),
            Loss::L2norm => write!(f, "L2norm"),
            Loss::Quadratic => write!(f, "Quadratic"),
            Loss::CrossEntropy => write!(f, "CrossEntropy"),
            Loss::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl fmt::Display for Loss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Loss::Hinge => write!(f, "hinge"),
            Loss::L1norm => write!(f, "l1norm"),
            Loss::L2norm => write!(f, "l2norm"),
            Loss::Quadratic => write!(f, "quadratic"),
            Loss::CrossEntropy => write!(f, "cross entropy"),
            Loss::Custom(_) => write!(f, "customise"),
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::algodiff::diff_;

    fn loss_of(loss: &Loss, y: Value, y_pred: Value) -> f64 {
        loss.run(&y, &y_pred).unwrap().to_scalar().unwrap()
    }

    #[test]
    fn closed_forms() {
        let y = Value::from(array![[1.0], [-1.0]]);
        let y_pred = Value::from(array![[0.5], [1.0]]);

        // residuals are [0.5, -2]
        assert_eq!(loss_of(&Loss::L1norm, y.clone(), y_pred.clone()), 2.5);
        assert_eq!(loss_of(&Loss::Quadratic, y.clone(), y_pred.clone()), 4.25);
        let l2 = loss_of(&Loss::L2norm, y.clone(), y_pred.clone());
        assert!((l2 - 4.25f64.sqrt()).abs() < 1e-12);
        // margins are [0.5, -1]
        assert_eq!(loss_of(&Loss::Hinge, y, y_pred), 0.5 + 2.0);
    }

    #[test]
    fn cross_entropy() {
        let y = Value::from(array![0.0, 1.0]);
        let y_pred = Value::from(array![0.5, 0.25]);
        let l = loss_of(&Loss::CrossEntropy, y, y_pred);
        assert!((l - 4f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn quadratic_carries_the_derivative() {
        let y = Value::Scalar(5.0);
        let (l, dl) = diff_(|w| Loss::Quadratic.run(&y, w), &Value::Scalar(0.0)).unwrap();
        assert_eq!(l, Value::Scalar(25.0));
        assert_eq!(dl, Value::Scalar(-10.0));
    }

    #[test]
    fn custom_losses_are_called() {
        let loss = Loss::Custom(Arc::new(|y: &Value, y_pred: &Value| sub(y, y_pred)));
        assert_eq!(loss_of(&loss, Value::Scalar(3.0), Value::Scalar(1.0)), 2.0);
        assert_eq!(loss.clone(), loss);

        let other = Loss::Custom(Arc::new(|y: &Value, _: &Value| -> Result<Value> {
            Ok(y.clone())
        }));
        assert_ne!(loss, other);
    }

    #[test]
    fn custom_losses_are_not_serialised() {
        let loss = Loss::Custom(Arc::new(|y: &Value, _: &Value| -> Result<Value> {
            Ok(y.clone())
        }));
        assert!(serde_json::to_string(&loss).is_err());
        assert_eq!(serde_json::to_string(&Loss::Quadratic).unwrap(), "\"quadratic\"");
    }
}
