use std::{fmt, fs, path::Path};

use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use super::{
    Batch, Checkpoint, Clipping, Gradient, LearningRate, Loss, Momentum, Regularisation, Stopping,
    Tolerances,
};
use crate::Result;

/// The configuration of a training run, one strategy per concern.
///
/// Every field is optional when deserialising, missing ones keep their baseline value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    pub epochs: f64,
    pub batch: Batch,
    pub gradient: Gradient,
    pub loss: Loss,
    pub learning_rate: LearningRate,
    pub regularisation: Regularisation,
    pub momentum: Momentum,
    pub clipping: Clipping,
    pub stopping: Stopping,
    pub checkpoint: Checkpoint,
    pub tolerances: Tolerances,
    pub verbosity: bool,
    /// Seeds the random number generator used for sampled batching.
    pub seed: Option<u64>,
}

impl Params {
    /// Returns the baseline `Params` training for the given amount of epochs.
    pub fn config(epochs: f64) -> Self {
        Self {
            epochs,
            ..Default::default()
        }
    }

    /// Parses a `Params` out of a JSON document, missing fields keep their baseline value.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON document from `path` and parses it with `from_json`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn with_batch(mut self, batch: Batch) -> Self {
        self.batch = batch;
        self
    }

    pub fn with_gradient(mut self, gradient: Gradient) -> Self {
        self.gradient = gradient;
        self
    }

    pub fn with_loss(mut self, loss: Loss) -> Self {
        self.loss = loss;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: LearningRate) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_regularisation(mut self, regularisation: Regularisation) -> Self {
        self.regularisation = regularisation;
        self
    }

    pub fn with_momentum(mut self, momentum: Momentum) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn with_clipping(mut self, clipping: Clipping) -> Self {
        self.clipping = clipping;
        self
    }

    pub fn with_stopping(mut self, stopping: Stopping) -> Self {
        self.stopping = stopping;
        self
    }

    pub fn with_checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    pub fn with_verbosity(mut self, verbosity: bool) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Creates the random number generator for this run.
    ///
    /// # Returns
    /// A generator seeded with `seed`, or from the OS if there's none.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            epochs: 1.0,
            batch: Batch::default(),
            gradient: Gradient::default(),
            loss: Loss::default(),
            learning_rate: LearningRate::default(),
            regularisation: Regularisation::default(),
            momentum: Momentum::default(),
            clipping: Clipping::default(),
            stopping: Stopping::default(),
            checkpoint: Checkpoint::default(),
            tolerances: Tolerances::default(),
            verbosity: true,
            seed: None,
        }
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Training config")?;
        writeln!(f, "    epochs         : {}", self.epochs)?;
        writeln!(f, "    batch          : {}", self.batch)?;
        writeln!(f, "    method         : {}", self.gradient)?;
        writeln!(f, "    loss           : {}", self.loss)?;
        writeln!(f, "    learning rate  : {}", self.learning_rate)?;
        writeln!(f, "    regularisation : {}", self.regularisation)?;
        writeln!(f, "    momentum       : {}", self.momentum)?;
        writeln!(f, "    clipping       : {}", self.clipping)?;
        writeln!(f, "    stopping       : {}", self.stopping)?;
        writeln!(f, "    checkpoint     : {}", self.checkpoint)?;
        writeln!(f, "    tolerances     : {}", self.tolerances)?;
        write!(f, "    verbosity      : {}", self.verbosity)
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;
    use crate::OptimErr;

    #[test]
    fn baseline() {
        let params = Params::default();
        assert_eq!(params.epochs, 1.0);
        assert_eq!(params.batch, Batch::Sample(100));
        assert_eq!(params.gradient, Gradient::GD);
        assert_eq!(params.loss, Loss::CrossEntropy);
        assert_eq!(params.learning_rate, LearningRate::Const(0.0));
        assert_eq!(params.regularisation, Regularisation::None);
        assert_eq!(params.momentum, Momentum::None);
        assert_eq!(params.clipping, Clipping::None);
        assert_eq!(params.stopping, Stopping::None);
        assert_eq!(params.checkpoint, Checkpoint::None);
        assert_eq!(params.tolerances, Tolerances::default());
        assert!(params.verbosity);
        assert_eq!(params.seed, None);
    }

    #[test]
    fn overrides_leave_the_rest_alone() {
        let params = Params::config(50.0)
            .with_loss(Loss::Quadratic)
            .with_batch(Batch::Full);

        assert_eq!(
            params,
            Params {
                epochs: 50.0,
                loss: Loss::Quadratic,
                batch: Batch::Full,
                ..Default::default()
            }
        );
    }

    #[test]
    fn partial_json_keeps_the_baseline() {
        let json = r#"{
            "epochs": 10,
            "learning_rate": { "decay": [0.5, 0.01] },
            "momentum": { "nesterov": 0.8 },
            "gradient": "nonlinear_cg",
            "tolerances": { "adagrad": 1e-4 },
            "verbosity": false
        }"#;

        let params = Params::from_json(json).unwrap();
        assert_eq!(
            params,
            Params::config(10.0)
                .with_learning_rate(LearningRate::Decay(0.5, 0.01))
                .with_momentum(Momentum::Nesterov(0.8))
                .with_gradient(Gradient::NonlinearCG)
                .with_tolerances(Tolerances {
                    adagrad: 1e-4,
                    ..Tolerances::default()
                })
                .with_verbosity(false)
        );
    }

    #[test]
    fn custom_variants_cannot_be_parsed() {
        let err = Params::from_json(r#"{ "loss": "custom" }"#).unwrap_err();
        assert!(matches!(err, OptimErr::Json(_)));
    }

    #[test]
    fn missing_files_are_io_errors() {
        let err = Params::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, OptimErr::Io(_)));
    }

    #[test]
    fn seeded_rngs_repeat() {
        let params = Params::default().with_seed(7);
        let a: u64 = params.rng().random();
        let b: u64 = params.rng().random();
        assert_eq!(a, b);
    }

    #[test]
    fn summary_lists_every_strategy() {
        let summary = Params::default().to_string();
        assert!(summary.starts_with("--- Training config"));
        assert!(summary.contains("batch          : sample (100)"));
        assert!(summary.contains("learning rate  : constant (a = 0)"));
    }
}
