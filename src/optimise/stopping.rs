use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{OptimErr, Result};

/// Decides whether training should end before the batch budget is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stopping {
    /// Stops once the loss falls below the threshold.
    Const(f64),
    /// `Early(patience, window)`.
    Early(usize, usize),
    #[default]
    None,
}

impl Stopping {
    /// Whether training should stop given this iteration's loss.
    pub fn run(&self, loss: f64) -> Result<bool> {
        match *self {
            Stopping::Const(a) => Ok(loss < a),
            Stopping::Early(..) => Err(OptimErr::NotImplemented {
                what: "early stopping",
            }),
            Stopping::None => Ok(false),
        }
    }

    /// Returns the same variant with its canonical parameters.
    pub fn with_defaults(&self) -> Self {
        match self {
            Stopping::Const(_) => Stopping::Const(1e-6),
            Stopping::Early(..) => Stopping::Early(750, 10),
            Stopping::None => Stopping::None,
        }
    }
}

impl fmt::Display for Stopping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stopping::Const(a) => write!(f, "const (a = {a})"),
            Stopping::Early(p, w) => write!(f, "early (patience = {p}, window = {w})"),
            Stopping::None => write!(f, "none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn const_stops_below_the_threshold() {
        let stopping = Stopping::Const(1e-3);
        assert!(!stopping.run(1e-3).unwrap());
        assert!(stopping.run(9e-4).unwrap());
        assert!(!Stopping::None.run(0.0).unwrap());
    }

    #[test]
    fn early_stopping_is_not_implemented() {
        assert!(matches!(
            Stopping::Early(750, 10).run(1.0),
            Err(OptimErr::NotImplemented { .. })
        ));
    }
}
