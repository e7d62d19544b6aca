//! One JSON file per round in a directory tree.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::{IterationSnapshot, SnapshotStore};
use crate::error::{Error, Result};

/// Writes each snapshot to `{root}/T{trial}/exp_imp_saves/{iteration}.json`.
///
/// Files are written to a temporary sibling first and renamed into place,
/// so a reader never sees a half-written snapshot.
///
/// # Examples
///
/// ```no_run
/// use elicit::storage::DirectorySnapshotStore;
///
/// let store = DirectorySnapshotStore::new("runs/office-a");
/// assert!(store.path_for(0, 3).ends_with("T0/exp_imp_saves/3.json"));
/// ```
#[derive(Debug)]
pub struct DirectorySnapshotStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl DirectorySnapshotStore {
    /// Creates a store rooted at `root`. Directories are created on the
    /// first write.
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the snapshots of one trial.
    #[must_use]
    pub fn trial_dir(&self, trial: usize) -> PathBuf {
        self.root.join(format!("T{trial}")).join("exp_imp_saves")
    }

    /// File the snapshot of one round is written to.
    #[must_use]
    pub fn path_for(&self, trial: usize, iteration: usize) -> PathBuf {
        self.trial_dir(trial).join(format!("{iteration}.json"))
    }
}

fn persistence(e: impl core::fmt::Display) -> Error {
    Error::Persistence(e.to_string())
}

impl SnapshotStore for DirectorySnapshotStore {
    fn save(&self, snapshot: &IterationSnapshot) -> Result<()> {
        let _guard = self.write_lock.lock();

        let dir = self.trial_dir(snapshot.trial);
        fs::create_dir_all(&dir).map_err(persistence)?;

        let json = serde_json::to_vec(snapshot).map_err(persistence)?;
        let target = self.path_for(snapshot.trial, snapshot.iter_num);
        let tmp = target.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp).map_err(persistence)?;
        file.write_all(&json).map_err(persistence)?;
        file.sync_all().map_err(persistence)?;
        drop(file);

        fs::rename(&tmp, &target).map_err(persistence)
    }

    fn load(&self, trial: usize, iteration: usize) -> Result<Option<IterationSnapshot>> {
        let bytes = match fs::read(self.path_for(trial, iteration)) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(persistence(e)),
        };
        serde_json::from_slice(&bytes).map(Some).map_err(persistence)
    }

    fn iterations(&self, trial: usize) -> Result<Vec<usize>> {
        let entries = match fs::read_dir(self.trial_dir(trial)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(persistence(e)),
        };

        let mut iterations = Vec::new();
        for entry in entries {
            let path = entry.map_err(persistence)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(n) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse().ok())
            {
                iterations.push(n);
            }
        }
        iterations.sort_unstable();
        Ok(iterations)
    }
}
