use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    OptimErr, Result,
    algodiff::{
        Value,
        maths::{l2norm, mul},
    },
};

/// Bounds the gradient before it is turned into a direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clipping {
    /// Rescales gradients whose l2 norm exceeds the threshold.
    L2norm(f64),
    /// `Value(lo, hi)`, clamps every component into a range.
    Value(f64, f64),
    #[default]
    None,
}

impl Clipping {
    /// Returns the clipped gradient.
    pub fn run(&self, g: &Value) -> Result<Value> {
        match *self {
            Clipping::L2norm(t) => {
                let norm = l2norm(g)?.to_scalar()?;
                if norm > t {
                    mul(g, &Value::Scalar(t / norm))
                } else {
                    Ok(g.clone())
                }
            }
            Clipping::Value(..) => Err(OptimErr::NotImplemented {
                what: "value clipping",
            }),
            Clipping::None => Ok(g.clone()),
        }
    }

    /// Returns the same variant with its canonical parameters.
    pub fn with_defaults(&self) -> Self {
        match self {
            Clipping::L2norm(_) => Clipping::L2norm(1.0),
            Clipping::Value(..) => Clipping::Value(0.0, 1.0),
            Clipping::None => Clipping::None,
        }
    }
}

impl fmt::Display for Clipping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clipping::L2norm(t) => write!(f, "l2norm (threshold = {t})"),
            Clipping::Value(lo, hi) => write!(f, "value (min = {lo}, max = {hi})"),
            Clipping::None => write!(f, "none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn rescales_long_gradients() {
        let g = Value::from(array![3.0, 4.0]);
        let Value::Tensor(c) = Clipping::L2norm(1.0).run(&g).unwrap() else {
            panic!("expected a tensor");
        };

        let expected = [0.6, 0.8];
        for (v, e) in c.iter().zip(expected) {
            assert!((v - e).abs() < 1e-12);
        }
    }

    #[test]
    fn keeps_short_gradients() {
        let g = Value::from(array![0.3, 0.4]);
        assert_eq!(Clipping::L2norm(1.0).run(&g).unwrap(), g);
        assert_eq!(Clipping::None.run(&g).unwrap(), g);
    }

    #[test]
    fn value_clipping_is_not_implemented() {
        let g = Value::Scalar(2.0);
        assert!(matches!(
            Clipping::Value(0.0, 1.0).run(&g),
            Err(OptimErr::NotImplemented { .. })
        ));
    }
}
