//! JSONL-based journal snapshot store.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use parking_lot::Mutex;

use super::{IterationSnapshot, SnapshotStore};
use crate::error::{Error, Result};

/// Appends snapshots as JSON lines to a single file.
///
/// Several processes may share one journal: writes hold an exclusive file
/// lock, reads a shared one. When a `(trial, iteration)` appears more than
/// once, the last line wins.
///
/// # Examples
///
/// ```no_run
/// use elicit::storage::JournalSnapshotStore;
///
/// let store = JournalSnapshotStore::new("snapshots.jsonl");
/// ```
pub struct JournalSnapshotStore {
    path: PathBuf,
    /// Serialise in-process writes so we only hold the file lock briefly.
    write_lock: Mutex<()>,
}

impl JournalSnapshotStore {
    /// Creates a journal at `path`. The file is created on the first write.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<IterationSnapshot>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Persistence(e.to_string())),
        };

        file.lock_shared()
            .map_err(|e| Error::Persistence(e.to_string()))?;

        let mut snapshots = Vec::new();
        for line in BufReader::new(&file).lines() {
            let line = line.map_err(|e| Error::Persistence(e.to_string()))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            snapshots.push(
                serde_json::from_str(line).map_err(|e| Error::Persistence(e.to_string()))?,
            );
        }

        file.unlock()
            .map_err(|e| Error::Persistence(e.to_string()))?;
        Ok(snapshots)
    }
}

impl SnapshotStore for JournalSnapshotStore {
    fn save(&self, snapshot: &IterationSnapshot) -> Result<()> {
        let _guard = self.write_lock.lock();

        let line =
            serde_json::to_string(snapshot).map_err(|e| Error::Persistence(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::Persistence(e.to_string()))?;

        file.lock_exclusive()
            .map_err(|e| Error::Persistence(e.to_string()))?;
        writeln!(file, "{line}").map_err(|e| Error::Persistence(e.to_string()))?;
        file.flush()
            .map_err(|e| Error::Persistence(e.to_string()))?;
        file.unlock()
            .map_err(|e| Error::Persistence(e.to_string()))?;

        Ok(())
    }

    fn load(&self, trial: usize, iteration: usize) -> Result<Option<IterationSnapshot>> {
        Ok(self
            .read_all()?
            .into_iter()
            .rev()
            .find(|s| s.trial == trial && s.iter_num == iteration))
    }

    fn iterations(&self, trial: usize) -> Result<Vec<usize>> {
        let mut iterations: Vec<usize> = self
            .read_all()?
            .iter()
            .filter(|s| s.trial == trial)
            .map(|s| s.iter_num)
            .collect();
        iterations.sort_unstable();
        iterations.dedup();
        Ok(iterations)
    }
}
