use std::{
    cell::RefCell,
    path::{Path, PathBuf},
};

use dual_optim::{
    OptimErr, Result,
    algodiff::{Value, maths::mul},
    optimise::{
        Batch, Checkpoint, Groups, LearningRate, Loss, Network, Params, Regularisation,
        minimise_network,
    },
};
use ndarray::array;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `y = w * x` with a single scalar weight.
struct Scale {
    w: f64,
    saves: RefCell<Vec<PathBuf>>,
    fail_saves: bool,
}

impl Scale {
    fn new(w: f64) -> Self {
        Self {
            w,
            saves: RefCell::new(Vec::new()),
            fail_saves: false,
        }
    }
}

impl Network for Scale {
    fn forward(&mut self, x: &Value) -> Result<(Value, Groups)> {
        let w = Value::make_dual(Value::Scalar(self.w), Value::Scalar(1.0));
        let y_pred = mul(x, &w)?;
        Ok((y_pred, vec![vec![w]]))
    }

    fn backward(&mut self, loss: &Value) -> Result<(Groups, Groups)> {
        let ws = vec![vec![Value::Scalar(self.w)]];
        let gs = vec![vec![loss.tangent()]];
        Ok((ws, gs))
    }

    fn update(&mut self, weights: Groups) -> Result<()> {
        self.w = weights[0][0].to_scalar()?;
        Ok(())
    }

    fn save(&self, path: &Path) -> Result<()> {
        if self.fail_saves {
            return Err(std::io::Error::other("read-only file system").into());
        }

        self.saves.borrow_mut().push(path.to_path_buf());
        Ok(())
    }
}

fn doubling() -> (Value, Value) {
    (
        Value::from(array![[1.0], [2.0], [3.0]]),
        Value::from(array![[2.0], [4.0], [6.0]]),
    )
}

fn params(epochs: f64) -> Params {
    Params::config(epochs)
        .with_batch(Batch::Full)
        .with_loss(Loss::Quadratic)
        .with_learning_rate(LearningRate::Const(0.05))
        .with_verbosity(false)
}

#[test]
fn learns_a_single_weight() {
    init();
    let (x, y) = doubling();
    let mut net = Scale::new(0.0);

    let state = minimise_network(&params(30.0), &mut net, &x, &y).unwrap();

    // mean of the squared residuals at w = 0
    assert!((state.loss[0] - 56.0 / 3.0).abs() < 1e-12);
    assert!(state.loss[30] < 1e-12);
    assert!((net.w - 2.0).abs() < 1e-6);
    assert!(net.saves.borrow().is_empty());
}

#[test]
fn regularisation_covers_every_weight() {
    init();
    let (x, y) = doubling();
    let mut net = Scale::new(0.0);

    let params = params(100.0).with_regularisation(Regularisation::L2norm(0.1));
    minimise_network(&params, &mut net, &x, &y).unwrap();

    // the minimum of (56 - 56w + 14w^2) / 3 + 0.1 w^2
    let expected = 56.0 / 28.6;
    assert!((net.w - expected).abs() < 1e-6);
}

#[test]
fn checkpoints_save_the_network() {
    init();
    let (x, y) = doubling();
    let mut net = Scale::new(0.0);

    let params = params(20.0).with_checkpoint(Checkpoint::Batch(5));
    let state = minimise_network(&params, &mut net, &x, &y).unwrap();

    assert_eq!(state.current_batch, 20);
    let saves = net.saves.borrow();
    assert_eq!(saves.len(), 3);
    for path in saves.iter() {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        assert!(name.starts_with("model."));
    }
}

#[test]
fn save_failures_abort_the_run() {
    init();
    let (x, y) = doubling();
    let mut net = Scale::new(0.0);
    net.fail_saves = true;

    let params = params(20.0).with_checkpoint(Checkpoint::Batch(5));
    let err = minimise_network(&params, &mut net, &x, &y).unwrap_err();

    assert!(matches!(err, OptimErr::Io(_)));
}
