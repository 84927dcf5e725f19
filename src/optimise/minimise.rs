use std::path::Path;

use log::{debug, info};
use rand::Rng;

use super::{Groups, Momentum, Network, Params, Regularisation, State};
use crate::{
    OptimErr, Result,
    algodiff::{
        Value, backend, grad_,
        maths::{add, div, mul, neg},
        zero,
    },
};

/// What an iteration hands over to the next one.
#[derive(Debug, Clone)]
struct Carry<T> {
    /// The previous gradient.
    grad: T,
    /// The previous descent direction.
    direction: T,
    /// The previous update.
    velocity: T,
    /// The gradient accumulator of the learning rate.
    cache: T,
}

impl Carry<Value> {
    fn bootstrap(g: Value) -> Result<Self> {
        Ok(Self {
            direction: neg(&g)?,
            velocity: zero(&g),
            cache: zero(&g),
            grad: g,
        })
    }
}

impl Carry<Groups> {
    fn bootstrap(gs: Groups) -> Result<Self> {
        Ok(Self {
            direction: zip_groups([&gs], |[g]| neg(g))?,
            velocity: zip_groups([&gs], |[g]| Ok(zero(g)))?,
            cache: zip_groups([&gs], |[g]| Ok(zero(g)))?,
            grad: gs,
        })
    }
}

// The loss of a batch as a function of the weights.
fn objective<'a, F>(
    params: &'a Params,
    f: &'a F,
    x: &'a Value,
    y: &'a Value,
) -> impl Fn(&Value) -> Result<Value> + 'a
where
    F: Fn(&Value, &Value) -> Result<Value>,
{
    move |w: &Value| {
        let y_pred = f(w, x)?;
        add(&params.loss.run(y, &y_pred)?, &params.regularisation.run(w)?)
    }
}

/// Minimises the loss of the model `f` over the dataset `(x, y)` by adjusting the weights `w`.
///
/// # Arguments
/// * `params` - The training configuration.
/// * `f` - The model, called with the weights and a batch of samples.
/// * `w` - The initial weights.
/// * `x` - The samples, one per row.
/// * `y` - The targets, one per row.
///
/// There is no model to persist, so `Checkpoint::Batch` and `Checkpoint::Epoch` save nothing
/// here. Only `Checkpoint::Custom` has an effect.
///
/// # Returns
/// The final state of the run, holding the loss history, and the trained weights.
///
/// # Errors
/// Any error raised by a strategy, by the model or while saving a checkpoint aborts the run.
pub fn minimise_weight<F>(
    params: &Params,
    f: F,
    w: Value,
    x: &Value,
    y: &Value,
) -> Result<(State, Value)>
where
    F: Fn(&Value, &Value) -> Result<Value>,
{
    if params.verbosity {
        info!("{params}");
    }

    let mut rng = params.rng();
    let mut state = State::new(params.batch.batches(x)?, params.epochs);
    let mut w = w.primal_deep();

    let (xt, yt) = params.batch.run(x, y, 0, &mut rng)?;
    let (loss, g) = grad_(objective(params, &f, &xt, &yt), &w)?;
    state.loss[0] = loss.to_scalar()?;
    debug!(loss = state.loss[0]; "bootstrapped");

    let mut carry = Carry::<Value>::bootstrap(g)?;

    while !state.stop && state.current_batch < state.batches {
        let i = state.current_batch + 1;
        (carry, w) = iterate_weight(params, &f, x, y, i, &mut state, carry, w, &mut rng)?;
    }

    if params.verbosity && state.current_batch >= state.batches {
        info!("{}", state.summary());
    }

    Ok((state, w))
}

#[allow(clippy::too_many_arguments)]
fn iterate_weight<F, R>(
    params: &Params,
    f: &F,
    x: &Value,
    y: &Value,
    i: usize,
    state: &mut State,
    carry: Carry<Value>,
    w: Value,
    rng: &mut R,
) -> Result<(Carry<Value>, Value)>
where
    F: Fn(&Value, &Value) -> Result<Value>,
    R: Rng + ?Sized,
{
    let (xt, yt) = params.batch.run(x, y, i, rng)?;
    let objective = objective(params, f, &xt, &yt);
    let (loss, g) = grad_(&objective, &w)?;
    let loss = loss.to_scalar()?;

    params.checkpoint.run(&mut |_| Ok(()), i, loss, state)?;
    observe(params, i, loss, state)?;

    let g = params.clipping.run(&g)?;
    let tol = &params.tolerances;
    let p = params
        .gradient
        .run_with(tol, &objective, &w, &carry.grad, &carry.direction, &g)?;
    let cache = params.learning_rate.update_ch(&g, &carry.cache)?;
    let u = mul(&p, &params.learning_rate.run_with(tol, i, &g, &cache)?)?;
    let u = params.momentum.run(&carry.velocity, &u)?;
    let w = add(&w, &u)?.primal_deep();

    let velocity = match params.momentum {
        Momentum::None => carry.velocity,
        _ => u,
    };

    let carry = Carry {
        grad: g,
        direction: p,
        velocity,
        cache,
    };

    Ok((carry, w))
}

// Stopping criterion and status line, shared by both loops.
fn observe(params: &Params, i: usize, loss: f64, state: &mut State) -> Result<()> {
    if params.stopping.run(loss)? {
        debug!(batch = i, loss = loss; "stopping criterion met");
        state.stop = true;
    }

    if params.verbosity {
        info!("{}", state.status_line());
    }

    Ok(())
}

/// Minimises the loss of `network` over the dataset `(x, y)`.
///
/// The loss of every batch is averaged over its rows, the weights are updated in place through
/// `Network::update` and checkpoints are saved with `Network::save`.
///
/// # Arguments
/// * `params` - The training configuration.
/// * `network` - The network to train.
/// * `x` - The samples, one per row.
/// * `y` - The targets, one per row.
///
/// # Returns
/// The final state of the run, holding the loss history.
pub fn minimise_network<N>(params: &Params, network: &mut N, x: &Value, y: &Value) -> Result<State>
where
    N: Network + ?Sized,
{
    if params.verbosity {
        info!("{params}");
    }

    let mut rng = params.rng();
    let mut state = State::new(params.batch.batches(x)?, params.epochs);

    let (loss, _, gs) = evaluate(params, network, x, y, 0, &mut rng)?;
    state.loss[0] = loss;
    debug!(loss = loss; "bootstrapped");

    let mut carry = Carry::<Groups>::bootstrap(gs)?;

    while !state.stop && state.current_batch < state.batches {
        let i = state.current_batch + 1;
        carry = iterate_network(params, network, x, y, i, &mut state, carry, &mut rng)?;
    }

    if params.verbosity && state.current_batch >= state.batches {
        info!("{}", state.summary());
    }

    Ok(state)
}

// Runs the network on the i-th batch, returning the loss, the weights and their gradients.
fn evaluate<N, R>(
    params: &Params,
    network: &mut N,
    x: &Value,
    y: &Value,
    i: usize,
    rng: &mut R,
) -> Result<(f64, Groups, Groups)>
where
    N: Network + ?Sized,
    R: Rng + ?Sized,
{
    let (xt, yt) = params.batch.run(x, y, i, rng)?;
    let (y_pred, ws) = network.forward(&xt)?;

    let rows = match yt {
        Value::Scalar(_) => 1,
        _ => backend::rows(&yt)?,
    };
    let loss = div(&params.loss.run(&yt, &y_pred)?, &Value::Scalar(rows as f64))?;

    let loss = match params.regularisation {
        Regularisation::None => loss,
        reg => ws
            .iter()
            .flatten()
            .try_fold(loss, |acc, w| add(&acc, &reg.run(w)?))?,
    };

    let (ws, gs) = network.backward(&loss)?;
    Ok((loss.to_scalar()?, ws, gs))
}

#[allow(clippy::too_many_arguments)]
fn iterate_network<N, R>(
    params: &Params,
    network: &mut N,
    x: &Value,
    y: &Value,
    i: usize,
    state: &mut State,
    carry: Carry<Groups>,
    rng: &mut R,
) -> Result<Carry<Groups>>
where
    N: Network + ?Sized,
    R: Rng + ?Sized,
{
    let (loss, ws, gs) = evaluate(params, network, x, y, i, rng)?;

    params
        .checkpoint
        .run(&mut |path| save(&*network, path), i, loss, state)?;
    observe(params, i, loss, state)?;

    let identity = |w: &Value| -> Result<Value> { Ok(w.clone()) };
    let lr = &params.learning_rate;
    let tol = &params.tolerances;

    let gs = zip_groups([&gs], |[g]| params.clipping.run(g))?;
    let ps = zip_groups(
        [&ws, &carry.grad, &carry.direction, &gs],
        |[w, g, p, g_new]| params.gradient.run_with(tol, &identity, w, g, p, g_new),
    )?;
    let cache = zip_groups([&gs, &carry.cache], |[g, c]| lr.update_ch(g, c))?;
    let us = zip_groups([&ps, &gs, &cache], |[p, g, c]| {
        mul(p, &lr.run_with(tol, i, g, c)?)
    })?;
    let us = zip_groups([&carry.velocity, &us], |[u, u_new]| {
        params.momentum.run(u, u_new)
    })?;
    let ws = zip_groups([&ws, &us], |[w, u]| Ok(add(w, u)?.primal_deep()))?;

    network.update(ws)?;

    let velocity = match params.momentum {
        Momentum::None => carry.velocity,
        _ => us,
    };

    Ok(Carry {
        grad: gs,
        direction: ps,
        velocity,
        cache,
    })
}

fn save<N>(network: &N, path: &Path) -> Result<()>
where
    N: Network + ?Sized,
{
    info!("checkpoint => {}", path.display());
    network.save(path)
}

/// Applies `f` to the matching weights of every group set, which must be equally shaped.
fn zip_groups<const N: usize, F>(groups: [&Groups; N], f: F) -> Result<Groups>
where
    F: Fn([&Value; N]) -> Result<Value>,
{
    let lens = |g: &Groups| g.iter().map(Vec::len).collect::<Vec<_>>();
    let Some(&first) = groups.first() else {
        return Ok(Vec::new());
    };

    for &other in &groups[1..] {
        if lens(first) != lens(other) {
            return Err(OptimErr::ShapeMismatch {
                op: "weight groups",
                lhs: lens(first),
                rhs: lens(other),
            });
        }
    }

    first
        .iter()
        .enumerate()
        .map(|(i, group)| {
            (0..group.len())
                .map(|j| f(groups.map(|g| &g[i][j])))
                .collect::<Result<Vec<_>>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(values: &[&[f64]]) -> Groups {
        values
            .iter()
            .map(|g| g.iter().map(|v| Value::Scalar(*v)).collect())
            .collect()
    }

    #[test]
    fn zips_matching_groups() {
        let a = groups(&[&[1.0, 2.0], &[3.0]]);
        let b = groups(&[&[10.0, 20.0], &[30.0]]);

        let c = zip_groups([&a, &b], |[x, y]| add(x, y)).unwrap();
        assert_eq!(c, groups(&[&[11.0, 22.0], &[33.0]]));
    }

    #[test]
    fn rejects_mismatched_groups() {
        let a = groups(&[&[1.0, 2.0], &[3.0]]);
        let b = groups(&[&[1.0], &[2.0, 3.0]]);

        assert!(matches!(
            zip_groups([&a, &b], |[x, _]| Ok(x.clone())),
            Err(OptimErr::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn bootstrap_points_downhill() {
        let carry = Carry::<Value>::bootstrap(Value::Scalar(4.0)).unwrap();
        assert_eq!(carry.direction, Value::Scalar(-4.0));
        assert_eq!(carry.velocity, Value::Scalar(0.0));
        assert_eq!(carry.cache, Value::Scalar(0.0));
    }
}
