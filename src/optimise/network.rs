use std::path::Path;

use crate::{Result, algodiff::Value};

/// The weights, or gradients, of a network grouped by layer.
pub type Groups = Vec<Vec<Value>>;

/// A model that can be trained with `minimise_network`.
///
/// The network owns its weights, the optimizer only sees them through `forward` and `backward`
/// and hands the new ones back through `update`.
pub trait Network {
    /// Runs the network on a batch.
    ///
    /// # Arguments
    /// * `x` - The batch of samples.
    ///
    /// # Returns
    /// The prediction, built from differentiable weights, and those weights.
    fn forward(&mut self, x: &Value) -> Result<(Value, Groups)>;

    /// Differentiates the loss of the last `forward` call.
    ///
    /// # Returns
    /// The plain weights and their gradients, grouped the same way.
    fn backward(&mut self, loss: &Value) -> Result<(Groups, Groups)>;

    /// Replaces the weights of the network.
    fn update(&mut self, weights: Groups) -> Result<()>;

    /// Persists the network at `path`.
    fn save(&self, path: &Path) -> Result<()>;
}
