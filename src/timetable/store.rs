use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::timetable::schema::Snapshot;

/// Persists the last known snapshot as a pretty-printed JSON array of
/// lessons so the watcher survives restarts. Loading is a direct structural
/// deserialization; no re-normalization happens on the way back in.
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `None` when no snapshot has been persisted yet.
    pub fn load(&self) -> Result<Option<Snapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading snapshot: {}", self.path.display()))?;
        let snapshot = serde_json::from_str(&data)
            .with_context(|| format!("failed parsing snapshot: {}", self.path.display()))?;
        Ok(Some(snapshot))
    }

    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating snapshot directory: {}", parent.display())
            })?;
        }
        let data = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, data)
            .with_context(|| format!("failed writing snapshot: {}", self.path.display()))
    }
}
