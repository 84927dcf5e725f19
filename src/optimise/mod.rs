//! Training strategies and the optimisation loop.

mod batch;
mod checkpoint;
mod clipping;
mod gradient;
mod learning_rate;
mod loss;
mod minimise;
mod momentum;
mod network;
mod params;
mod regularisation;
mod stopping;
mod tolerance;

pub use batch::Batch;
pub use checkpoint::{Checkpoint, CheckpointFn, State};
pub use clipping::Clipping;
pub use gradient::Gradient;
pub use learning_rate::LearningRate;
pub use loss::{Loss, LossFn};
pub use minimise::{minimise_network, minimise_weight};
pub use momentum::Momentum;
pub use network::{Groups, Network};
pub use params::Params;
pub use regularisation::Regularisation;
pub use stopping::Stopping;
pub use tolerance::{ADAGRAD_EPS, CONJUGATE_EPS, RMSPROP_EPS, Tolerances};
