use std::fmt;

use rand::{Rng, seq::index};
use serde::{Deserialize, Serialize};

use crate::{
    OptimErr, Result,
    algodiff::{Value, backend},
};

/// Selects the subset of the training data used in a given iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Batch {
    /// The whole dataset, every iteration.
    Full,
    /// Contiguous slices of the given size, wrapping around the dataset.
    Mini(usize),
    /// The given amount of rows drawn without replacement.
    Sample(usize),
    /// A single random row.
    Stochastic,
}

impl Batch {
    /// Returns the batch used in iteration `i`.
    ///
    /// # Arguments
    /// * `x` - The samples, one per row.
    /// * `y` - The targets, one per row.
    /// * `i` - The iteration number.
    /// * `rng` - A random number generator used for sampled batching.
    ///
    /// # Returns
    /// The samples and targets of the batch.
    pub fn run<R>(&self, x: &Value, y: &Value, i: usize, rng: &mut R) -> Result<(Value, Value)>
    where
        R: Rng + ?Sized,
    {
        match *self {
            Batch::Full => Ok((x.clone(), y.clone())),
            Batch::Mini(c) => chunk(x, y, i, c),
            Batch::Sample(c) => sample(x, y, c, rng),
            Batch::Stochastic => sample(x, y, 1, rng),
        }
    }

    /// Returns the amount of iterations that make up an epoch over `x`.
    pub fn batches(&self, x: &Value) -> Result<usize> {
        match *self {
            Batch::Full => Ok(1),
            Batch::Mini(0) => Err(OptimErr::InvalidInput("the mini batch size must be positive")),
            Batch::Sample(0) => Err(OptimErr::InvalidInput("the sample size must be positive")),
            Batch::Mini(c) | Batch::Sample(c) => {
                let n = backend::rows(x)?;
                Ok((n / c).max(1))
            }
            Batch::Stochastic => backend::rows(x),
        }
    }

    /// Returns the same variant with its canonical parameters.
    pub fn with_defaults(&self) -> Self {
        match self {
            Batch::Full => Batch::Full,
            Batch::Mini(_) => Batch::Mini(100),
            Batch::Sample(_) => Batch::Sample(100),
            Batch::Stochastic => Batch::Stochastic,
        }
    }
}

fn dataset_rows(x: &Value, y: &Value) -> Result<usize> {
    let n = backend::rows(x)?;
    let m = backend::rows(y)?;

    if n != m {
        return Err(OptimErr::ShapeMismatch {
            op: "batch",
            lhs: x.shape(),
            rhs: y.shape(),
        });
    }

    if n == 0 {
        return Err(OptimErr::InvalidInput("the dataset is empty"));
    }

    Ok(n)
}

fn chunk(x: &Value, y: &Value, i: usize, c: usize) -> Result<(Value, Value)> {
    let n = dataset_rows(x, y)?;

    if c == 0 {
        return Err(OptimErr::InvalidInput("the mini batch size must be positive"));
    }

    if c >= n {
        return Ok((x.clone(), y.clone()));
    }

    let start = (i * c) % n;
    let end = (start + c).min(n);

    Ok((
        backend::slice_rows(x, start..end)?,
        backend::slice_rows(y, start..end)?,
    ))
}

fn sample<R>(x: &Value, y: &Value, c: usize, rng: &mut R) -> Result<(Value, Value)>
where
    R: Rng + ?Sized,
{
    let n = dataset_rows(x, y)?;

    if c == 0 {
        return Err(OptimErr::InvalidInput("the sample size must be positive"));
    }

    let indices = index::sample(rng, n, c.min(n)).into_vec();

    Ok((
        backend::select_rows(x, &indices)?,
        backend::select_rows(y, &indices)?,
    ))
}

impl Default for Batch {
    fn default() -> Self {
        Batch::Sample(100)
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Batch::Full => write!(f, "full"),
            Batch::Mini(c) => write!(f, "mini ({c})"),
            Batch::Sample(c) => write!(f, "sample ({c})"),
            Batch::Stochastic => write!(f, "stochastic"),
        }
    }
}
