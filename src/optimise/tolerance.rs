use std::fmt;

use serde::{Deserialize, Serialize};

/// Keeps the Adagrad square root away from zero.
pub const ADAGRAD_EPS: f64 = 1e-8;

/// Keeps the RMSprop square root away from zero.
pub const RMSPROP_EPS: f64 = 1e-6;

/// Added to the denominator of the Hestenes-Stiefel coefficient.
pub const CONJUGATE_EPS: f64 = 1e-16;

/// The small constants that keep the adaptive rates and conjugate directions finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    pub adagrad: f64,
    pub rmsprop: f64,
    pub conjugate: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            adagrad: ADAGRAD_EPS,
            rmsprop: RMSPROP_EPS,
            conjugate: CONJUGATE_EPS,
        }
    }
}

impl fmt::Display for Tolerances {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "adagrad {:e}, rmsprop {:e}, conjugate {:e}",
            self.adagrad, self.rmsprop, self.conjugate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_constants() {
        let tol = Tolerances::default();
        assert_eq!(tol.adagrad, ADAGRAD_EPS);
        assert_eq!(tol.rmsprop, RMSPROP_EPS);
        assert_eq!(tol.conjugate, CONJUGATE_EPS);
        assert_eq!(tol.to_string(), "adagrad 1e-8, rmsprop 1e-6, conjugate 1e-16");
    }

    #[test]
    fn partial_overrides_keep_the_rest() {
        let tol: Tolerances = serde_json::from_str(r#"{ "rmsprop": 0.5 }"#).unwrap();
        assert_eq!(tol.rmsprop, 0.5);
        assert_eq!(tol.adagrad, ADAGRAD_EPS);
        assert_eq!(tol.conjugate, CONJUGATE_EPS);
    }
}
