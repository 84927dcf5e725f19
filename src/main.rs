use std::env;

use anyhow::Result;
use dual_optim::{
    algodiff::{Value, maths::dot},
    optimise::{Batch, LearningRate, Loss, Params, minimise_weight},
};
use log::info;
use ndarray::{Array2, Axis, concatenate};
use ndarray_rand::RandomExt;
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Normal, Uniform};

const SAMPLES: usize = 256;
const SEED: u64 = 42;

/// Returns `SAMPLES` points of the line `y = 3x + 2` with gaussian noise.
///
/// Every sample carries a trailing one so the bias is learnt as a regular weight.
fn dataset(n: usize, seed: u64) -> Result<(Value, Value)> {
    let mut rng = StdRng::seed_from_u64(seed);

    let xs = Array2::random_using((n, 1), Uniform::new(0.0, 1.0)?, &mut rng);
    let noise = Array2::random_using((n, 1), Normal::new(0.0, 0.1)?, &mut rng);
    let y = &xs * 3.0 + 2.0 + noise;

    let ones = Array2::<f64>::ones((n, 1));
    let x = concatenate(Axis(1), &[xs.view(), ones.view()])?;

    Ok((x.into(), y.into()))
}

fn main() -> Result<()> {
    env_logger::init();

    let params = match env::args().nth(1) {
        Some(path) => {
            info!("loading training config from {path}");
            Params::load(&path)?
        }
        None => Params::config(100.0)
            .with_batch(Batch::Mini(16))
            .with_loss(Loss::Quadratic)
            .with_learning_rate(LearningRate::Const(0.01))
            .with_verbosity(false)
            .with_seed(SEED),
    };

    let (x, y) = dataset(SAMPLES, SEED)?;
    let w = Value::from(Array2::<f64>::zeros((2, 1)));

    let (state, w) = minimise_weight(&params, |w, x| dot(x, w), w, &x, &y)?;

    let losses = state.losses();
    info!(
        "trained for {} batches in {:?}",
        losses.len() - 1,
        state.elapsed()
    );
    info!("final loss: {}", losses.last().copied().unwrap_or_default());
    info!("weights (slope, bias): {w}");

    Ok(())
}
