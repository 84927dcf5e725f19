use std::{
    env, fmt,
    path::{Path, PathBuf},
    process,
    sync::Arc,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

use crate::{OptimErr, Result};

/// A user supplied checkpoint, it may inspect and modify the training state.
pub type CheckpointFn = Arc<dyn Fn(&mut State) -> Result<()> + Send + Sync>;

/// The progress of a training run.
#[derive(Debug, Clone)]
pub struct State {
    /// The last batch that went through the checkpoint.
    pub current_batch: usize,
    pub batches_per_epoch: usize,
    pub epochs: f64,
    /// The batch budget of the whole run.
    pub batches: usize,
    /// The loss of every batch, indexed by batch number. Index 0 holds the initial loss.
    pub loss: Vec<f64>,
    pub start_at: Instant,
    /// Once set, the run ends before the next iteration.
    pub stop: bool,
}

impl State {
    /// Returns a new `State` for a run that has not started yet.
    ///
    /// # Arguments
    /// * `batches_per_epoch` - The amount of iterations that make up an epoch.
    /// * `epochs` - The amount of epochs, possibly fractional.
    pub fn new(batches_per_epoch: usize, epochs: f64) -> Self {
        let batches = (batches_per_epoch as f64 * epochs.max(0.0)) as usize;

        Self {
            current_batch: 0,
            batches_per_epoch,
            epochs,
            batches,
            loss: vec![0.0; batches + 1],
            start_at: Instant::now(),
            stop: false,
        }
    }

    /// Returns the losses recorded so far, starting with the initial one.
    pub fn losses(&self) -> &[f64] {
        let end = self.current_batch.min(self.batches);
        &self.loss[..=end]
    }

    /// Returns the time since the run started.
    pub fn elapsed(&self) -> Duration {
        self.start_at.elapsed()
    }

    /// Returns a one line description of the current iteration.
    pub fn status_line(&self) -> String {
        let b = self.current_batch;
        let l1 = self.loss.get(b).copied().unwrap_or(f64::NAN);
        let l0 = b
            .checked_sub(1)
            .and_then(|i| self.loss.get(i))
            .copied()
            .unwrap_or(l1);

        let trend = if l1 < l0 {
            "▼"
        } else if l1 > l0 {
            "▲"
        } else {
            "-"
        };

        format!(
            "#{} | T: {} | E: {}/{} | B: {}/{} | L: {:.6}[{}]",
            process::id(),
            format_time(self.elapsed()),
            b / self.batches_per_epoch.max(1),
            self.epochs,
            b,
            self.batches,
            l1,
            trend,
        )
    }

    /// Returns the summary of a finished run.
    pub fn summary(&self) -> String {
        format!("--- Training summary\n    duration: {}", format_time(self.elapsed()))
    }
}

fn format_time(d: Duration) -> String {
    let secs = d.as_secs_f64();

    match d.as_secs() {
        0..60 => format!("{secs:.2}s"),
        60..3600 => format!("{}m{:.0}s", d.as_secs() / 60, secs % 60.0),
        s => format!("{}h{}m", s / 3600, (s % 3600) / 60),
    }
}

/// When to save the model and hand control to user code.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkpoint {
    /// Every given amount of batches.
    Batch(usize),
    /// Every given, possibly fractional, amount of epochs.
    Epoch(f64),
    /// Calls the function on every batch.
    #[serde(skip)]
    Custom(CheckpointFn),
    #[default]
    None,
}

impl Checkpoint {
    /// Returns the amount of batches between checkpoints, zero if it never fires.
    pub fn interval(&self, state: &State) -> usize {
        match self {
            Checkpoint::Batch(n) => (*n).max(1),
            Checkpoint::Epoch(e) => ((e * state.batches_per_epoch as f64) as usize).max(1),
            Checkpoint::Custom(_) => 1,
            Checkpoint::None => 0,
        }
    }

    /// Records this iteration's loss in `state` and fires the checkpoint if it is due.
    ///
    /// # Arguments
    /// * `save` - Saves the model at the given path.
    /// * `current_batch` - The batch that just finished.
    /// * `loss` - Its loss.
    /// * `state` - The progress of the run.
    ///
    /// # Errors
    /// Save failures and errors raised by a custom checkpoint.
    pub fn run(
        &self,
        save: &mut dyn FnMut(&Path) -> Result<()>,
        current_batch: usize,
        loss: f64,
        state: &mut State,
    ) -> Result<()> {
        let slot = state
            .loss
            .get_mut(current_batch)
            .ok_or(OptimErr::InvalidInput("batch beyond the training budget"))?;

        *slot = loss;
        state.current_batch = current_batch;

        let interval = self.interval(state);
        if interval == 0 || current_batch % interval != 0 || current_batch >= state.batches {
            return Ok(());
        }

        match self {
            Checkpoint::Custom(f) => f(state),
            _ => save(&default_path()?),
        }
    }

    /// Returns the same variant with its canonical parameters.
    pub fn with_defaults(&self) -> Self {
        match self {
            Checkpoint::Batch(_) => Checkpoint::Batch(100),
            Checkpoint::Epoch(_) => Checkpoint::Epoch(1.0),
            Checkpoint::Custom(_) => {
                Checkpoint::Custom(Arc::new(|_: &mut State| -> Result<()> { Ok(()) }))
            }
            Checkpoint::None => Checkpoint::None,
        }
    }
}

fn default_path() -> Result<PathBuf> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    Ok(env::current_dir()?.join(format!("model.{secs}")))
}

impl PartialEq for Checkpoint {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Checkpoint::Batch(a), Checkpoint::Batch(b)) => a == b,
            (Checkpoint::Epoch(a), Checkpoint::Epoch(b)) => a == b,
            (Checkpoint::Custom(a), Checkpoint::Custom(b)) => Arc::ptr_eq(a, b),
            (Checkpoint::None, Checkpoint::None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checkpoint::Batch(n) => write!(f, "Batch({n})"),
            Checkpoint::Epoch(e) => write!(f, "Epoch({e})"),
            Checkpoint::Custom(_) => write!(f, "Custom(..)"),
            Checkpoint::None => write!(f, "None"),
        }
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checkpoint::Batch(n) => write!(f, "per batch (interval = {n})"),
            Checkpoint::Epoch(e) => write!(f, "per epoch (interval = {e})"),
            Checkpoint::Custom(_) => write!(f, "customise"),
            Checkpoint::None => write!(f, "none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn fired(checkpoint: &Checkpoint, state: &mut State) -> Vec<usize> {
        let mut saves = Vec::new();

        for i in 1..=state.batches {
            let save = &mut |_: &Path| -> Result<()> {
                saves.push(i);
                Ok(())
            };
            checkpoint.run(save, i, 1.0 / i as f64, state).unwrap();
        }

        saves
    }

    #[test]
    fn batch_interval_skips_the_last_batch() {
        let mut state = State::new(20, 1.0);
        assert_eq!(fired(&Checkpoint::Batch(5), &mut state), vec![5, 10, 15]);
        assert_eq!(state.current_batch, 20);
        assert_eq!(state.loss[4], 0.25);
    }

    #[test]
    fn epoch_interval_scales_with_the_epoch_size() {
        let mut state = State::new(4, 3.0);
        assert_eq!(Checkpoint::Epoch(0.5).interval(&state), 2);
        assert_eq!(Checkpoint::Epoch(0.1).interval(&state), 1);
        assert_eq!(fired(&Checkpoint::Epoch(1.0), &mut state), vec![4, 8]);
    }

    #[test]
    fn none_never_fires() {
        let mut state = State::new(10, 1.0);
        assert!(fired(&Checkpoint::None, &mut state).is_empty());
    }

    #[test]
    fn custom_checkpoints_see_every_batch() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);
        let checkpoint = Checkpoint::Custom(Arc::new(move |state: &mut State| -> Result<()> {
            record.lock().unwrap().push(state.current_batch);
            if state.current_batch == 3 {
                state.stop = true;
            }
            Ok(())
        }));

        let mut state = State::new(5, 1.0);
        for i in 1..=5 {
            checkpoint.run(&mut |_| Ok(()), i, 0.0, &mut state).unwrap();
        }

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4]);
        assert!(state.stop);
    }

    #[test]
    fn save_errors_propagate() {
        let mut state = State::new(10, 1.0);
        let err = Checkpoint::Batch(1)
            .run(
                &mut |_| Err(std::io::Error::other("disk full").into()),
                1,
                0.5,
                &mut state,
            )
            .unwrap_err();

        assert!(matches!(err, OptimErr::Io(_)));
    }

    #[test]
    fn the_loss_history_is_sized_by_the_budget() {
        let mut state = State::new(3, 2.5);
        assert_eq!(state.batches, 7);
        assert_eq!(state.loss.len(), 8);
        assert!(
            Checkpoint::None
                .run(&mut |_| Ok(()), 8, 0.0, &mut state)
                .is_err()
        );
    }

    #[test]
    fn status_line_shows_the_trend() {
        let mut state = State::new(10, 1.0);
        state.loss[0] = 2.0;
        Checkpoint::None
            .run(&mut |_| Ok(()), 1, 1.0, &mut state)
            .unwrap();

        let line = state.status_line();
        assert!(line.contains("B: 1/10"));
        assert!(line.ends_with("[▼]"));
        assert_eq!(state.losses(), &[2.0, 1.0]);
    }
}
