use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::{IterationSnapshot, SnapshotStore};
use crate::error::Result;

/// In-memory snapshot store.
///
/// Snapshots live in a `BTreeMap` keyed by `(trial, iteration)` behind a
/// read-write lock. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<BTreeMap<(usize, usize), IterationSnapshot>>,
}

impl MemorySnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots across all trials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    /// Whether nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, snapshot: &IterationSnapshot) -> Result<()> {
        self.snapshots
            .write()
            .insert((snapshot.trial, snapshot.iter_num), snapshot.clone());
        Ok(())
    }

    fn load(&self, trial: usize, iteration: usize) -> Result<Option<IterationSnapshot>> {
        Ok(self.snapshots.read().get(&(trial, iteration)).cloned())
    }

    fn iterations(&self, trial: usize) -> Result<Vec<usize>> {
        Ok(self
            .snapshots
            .read()
            .range((trial, 0)..=(trial, usize::MAX))
            .map(|(&(_, iteration), _)| iteration)
            .collect())
    }
}
