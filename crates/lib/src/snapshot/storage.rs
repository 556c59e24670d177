//! Snapshot storage.
//!
//! # Storage Layout
//!
//! ```text
//! {data_dir}/snapshots/
//! ├── index.json          # SnapshotIndex: list, current pointer, stale flag
//! └── <id>.json           # Individual ProjectSnapshot files
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::platform::paths::snapshots_dir;

use super::types::{ProjectSnapshot, SNAPSHOT_INDEX_VERSION, SnapshotError, SnapshotIndex, SnapshotMetadata};

const INDEX_FILENAME: &str = "index.json";

/// Manages snapshot storage on disk.
///
/// All writes go to a temporary file first and are renamed into place, so a
/// crash never leaves a half-written index or snapshot behind.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
  base_path: PathBuf,
}

impl SnapshotStore {
  pub fn new(base_path: impl Into<PathBuf>) -> Self {
    Self {
      base_path: base_path.into(),
    }
  }

  /// Store at `{data_dir}/snapshots`.
  pub fn default_store() -> Self {
    Self::new(snapshots_dir())
  }

  pub fn base_path(&self) -> &Path {
    &self.base_path
  }

  fn index_path(&self) -> PathBuf {
    self.base_path.join(INDEX_FILENAME)
  }

  fn snapshot_path(&self, id: &str) -> PathBuf {
    self.base_path.join(format!("{}.json", id))
  }

  fn write_atomic(&self, path: &Path, content: &str) -> Result<(), SnapshotError> {
    fs::create_dir_all(&self.base_path).map_err(SnapshotError::CreateDir)?;

    let mut temp_path = path.as_os_str().to_owned();
    temp_path.push(".tmp");
    let temp_path = PathBuf::from(temp_path);

    fs::write(&temp_path, content).map_err(SnapshotError::Write)?;
    fs::rename(&temp_path, path).map_err(SnapshotError::Write)
  }

  /// Load the snapshot index. Returns an empty index if none was written yet.
  pub fn load_index(&self) -> Result<SnapshotIndex, SnapshotError> {
    let content = match fs::read_to_string(self.index_path()) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SnapshotIndex::new()),
      Err(e) => return Err(SnapshotError::Read(e)),
    };

    let index: SnapshotIndex = serde_json::from_str(&content).map_err(SnapshotError::Parse)?;
    if index.version != SNAPSHOT_INDEX_VERSION {
      return Err(SnapshotError::UnsupportedVersion(index.version));
    }

    Ok(index)
  }

  fn save_index(&self, index: &SnapshotIndex) -> Result<(), SnapshotError> {
    let content = serde_json::to_string_pretty(index).map_err(SnapshotError::Serialize)?;
    self.write_atomic(&self.index_path(), &content)
  }

  fn update_index(&self, f: impl FnOnce(&mut SnapshotIndex) -> Result<(), SnapshotError>) -> Result<(), SnapshotError> {
    let mut index = self.load_index()?;
    f(&mut index)?;
    self.save_index(&index)
  }

  pub fn current_id(&self) -> Result<Option<String>, SnapshotError> {
    Ok(self.load_index()?.current)
  }

  /// Load the current snapshot, or `None` if no pass was ever committed.
  pub fn load_current(&self) -> Result<Option<ProjectSnapshot>, SnapshotError> {
    match self.load_index()?.current {
      Some(id) => Ok(Some(self.load_snapshot(&id)?)),
      None => Ok(None),
    }
  }

  pub fn load_snapshot(&self, id: &str) -> Result<ProjectSnapshot, SnapshotError> {
    let content = fs::read_to_string(self.snapshot_path(id)).map_err(|e| {
      if e.kind() == io::ErrorKind::NotFound {
        SnapshotError::NotFound(id.to_string())
      } else {
        SnapshotError::Read(e)
      }
    })?;

    serde_json::from_str(&content).map_err(SnapshotError::Parse)
  }

  fn write_snapshot(&self, snapshot: &ProjectSnapshot) -> Result<(), SnapshotError> {
    let content = serde_json::to_string_pretty(snapshot).map_err(SnapshotError::Serialize)?;
    self.write_atomic(&self.snapshot_path(&snapshot.id), &content)
  }

  /// Write a snapshot, make it current and clear the stale flag.
  pub fn save_and_set_current(&self, snapshot: &ProjectSnapshot) -> Result<(), SnapshotError> {
    self.write_snapshot(snapshot)?;
    self.update_index(|index| {
      index.add(snapshot.to_metadata());
      index.set_current(&snapshot.id)?;
      index.stale = false;
      Ok(())
    })?;
    debug!(id = %snapshot.id, generation = snapshot.generation, "committed snapshot");
    Ok(())
  }

  /// Flag the current snapshot as out of date after a failed pass.
  pub fn mark_stale(&self) -> Result<(), SnapshotError> {
    self.update_index(|index| {
      index.stale = true;
      Ok(())
    })
  }

  pub fn is_stale(&self) -> Result<bool, SnapshotError> {
    Ok(self.load_index()?.stale)
  }

  /// All snapshots, oldest first.
  pub fn list(&self) -> Result<Vec<SnapshotMetadata>, SnapshotError> {
    Ok(self.load_index()?.snapshots)
  }

  /// Remove a snapshot file and its index entry. Unknown ids are not an error.
  pub fn delete_snapshot(&self, id: &str) -> Result<(), SnapshotError> {
    match fs::remove_file(self.snapshot_path(id)) {
      Ok(()) => {}
      Err(e) if e.kind() == io::ErrorKind::NotFound => {}
      Err(e) => return Err(SnapshotError::Write(e)),
    }

    self.update_index(|index| {
      index.remove(id);
      Ok(())
    })
  }
}
