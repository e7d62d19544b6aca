//! Per-round snapshot persistence.
//!
//! Every decided round produces one [`IterationSnapshot`], keyed by
//! `(trial, iteration)`. The [`SnapshotStore`] trait defines how snapshots
//! are written and read back; the elicitor owns one store and writes to it
//! after each decision.
//!
//! # Available backends
//!
//! | Backend | Description | Feature flag |
//! |---------|-------------|-------------|
//! | [`MemorySnapshotStore`] | `BTreeMap` behind a read-write lock (the default) | none |
//! | [`DirectorySnapshotStore`] | One JSON file per round under `T{trial}/exp_imp_saves/` | none |
//! | `JournalSnapshotStore` | One JSONL file with `fs2` file locking | `journal` |
//!
//! A store failure never changes the decision of a round: the elicitor
//! records the error next to the decision and keeps going.
//!
//! ```
//! use elicit::storage::{MemorySnapshotStore, SnapshotStore};
//!
//! let store = MemorySnapshotStore::new();
//! assert!(store.iterations(0).unwrap().is_empty());
//! ```

mod directory;
#[cfg(feature = "journal")]
mod journal;
mod memory;

pub use directory::DirectorySnapshotStore;
#[cfg(feature = "journal")]
pub use journal::JournalSnapshotStore;
pub use memory::MemorySnapshotStore;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::history::Duel;
use crate::posterior::PosteriorSamples;
use crate::types::ModelId;

/// Format version written into every snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to audit or replay one round's decision.
///
/// Matrices are stored row-major as nested vectors, one row per posterior
/// sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterationSnapshot {
    /// Format version, currently [`SNAPSHOT_VERSION`].
    pub version: u32,
    /// Trial the round belongs to.
    pub trial: usize,
    /// Round index within the trial.
    pub iter_num: usize,
    /// GP model variant that was trained.
    pub model_id: ModelId,
    /// Mean EI per reachable candidate.
    pub mean_exp_imp: Vec<f64>,
    /// Mean EI of the chosen candidate.
    pub max_exp_imp: f64,
    /// Index of the chosen candidate.
    pub chosen_index: usize,
    /// The duel posed next.
    pub next_duel: Duel,
    /// Posterior hyperparameter samples.
    pub samples: PosteriorSamples,
    /// Raw duels the model was trained on.
    pub x: Vec<Vec<f64>>,
    /// Responses the model was trained on.
    pub y: Vec<f64>,
    /// Normalized duels.
    pub x_norm: Vec<Vec<f64>>,
    /// Posterior mean at the training inputs.
    pub mtrainmat: Vec<Vec<f64>>,
    /// Posterior variance at the training inputs.
    pub vartrainmat: Vec<Vec<f64>>,
    /// Posterior mean at the reachable inputs.
    pub mreachmat: Vec<Vec<f64>>,
    /// Posterior variance at the reachable inputs.
    pub varreachmat: Vec<Vec<f64>>,
}

/// Persists iteration snapshots.
///
/// Implementations must be `Send + Sync`: the async driver runs rounds on
/// a blocking worker thread.
pub trait SnapshotStore: Send + Sync {
    /// Store a snapshot, replacing any earlier one for the same
    /// `(trial, iteration)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`](crate::Error::Persistence) when the
    /// snapshot cannot be written.
    fn save(&self, snapshot: &IterationSnapshot) -> Result<()>;

    /// Read back the snapshot of one round, if any was stored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`](crate::Error::Persistence) when stored
    /// data exists but cannot be read.
    fn load(&self, trial: usize, iteration: usize) -> Result<Option<IterationSnapshot>>;

    /// Iterations stored for a trial, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`](crate::Error::Persistence) when the
    /// backing store cannot be listed.
    fn iterations(&self, trial: usize) -> Result<Vec<usize>>;
}

/// Rows of a matrix as nested vectors.
#[must_use]
pub fn matrix_rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    m.row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

#[cfg(test)]
pub(crate) fn sample_snapshot(trial: usize, iteration: usize) -> IterationSnapshot {
    let samples = PosteriorSamples::new(
        vec!["log_lengthscale_0".into(), "log_signal_variance".into()],
        vec![vec![-1.0, 0.1], vec![-0.9, 0.2]],
    )
    .unwrap_or_default();
    IterationSnapshot {
        version: SNAPSHOT_VERSION,
        trial,
        iter_num: iteration,
        model_id: ModelId::default(),
        mean_exp_imp: vec![0.1, 0.4, 0.2],
        max_exp_imp: 0.4,
        chosen_index: 1,
        next_duel: Duel::new(vec![22.0, 23.0]),
        samples,
        x: vec![vec![20.0, 22.0]],
        y: vec![1.0],
        x_norm: vec![vec![0.1, 0.3]],
        mtrainmat: vec![vec![0.5], vec![0.6]],
        vartrainmat: vec![vec![0.1], vec![0.2]],
        mreachmat: vec![vec![0.1, 0.2, 0.3], vec![0.2, 0.3, 0.4]],
        varreachmat: vec![vec![1.0, 1.0, 1.0], vec![0.9, 0.9, 0.9]],
    }
}
