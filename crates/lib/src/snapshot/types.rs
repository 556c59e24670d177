use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::project::Project;

/// Current on-disk version of the snapshot index.
pub const SNAPSHOT_INDEX_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
  #[error("failed to create snapshot directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to read snapshot data: {0}")]
  Read(#[source] io::Error),

  #[error("failed to write snapshot data: {0}")]
  Write(#[source] io::Error),

  #[error("failed to parse snapshot data: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("failed to serialize snapshot data: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("snapshot not found: {0}")]
  NotFound(String),

  #[error("unsupported snapshot index version {0} (expected {SNAPSHOT_INDEX_VERSION})")]
  UnsupportedVersion(u32),
}

/// A committed, immutable project model.
///
/// Produced by a successful pass and never mutated afterwards; readers share
/// it through an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
  pub id: String,
  /// Unix seconds.
  pub created_at: u64,
  /// Number of passes committed by the producing sync, starting at 0 for the base.
  pub generation: u64,
  /// SHA-256 of the serialized project.
  pub digest: String,
  /// Number of built targets the pass saw.
  pub target_count: usize,
  pub project: Project,
}

impl ProjectSnapshot {
  pub fn new(generation: u64, target_count: usize, project: Project) -> Result<Self, serde_json::Error> {
    Ok(Self {
      id: generate_snapshot_id(),
      created_at: unix_now(),
      generation,
      digest: project.digest()?,
      target_count,
      project,
    })
  }

  pub fn to_metadata(&self) -> SnapshotMetadata {
    SnapshotMetadata {
      id: self.id.clone(),
      created_at: self.created_at,
      generation: self.generation,
      digest: self.digest.clone(),
      target_count: self.target_count,
      library_count: self.project.libraries.len(),
    }
  }
}

/// Index entry describing one stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
  pub id: String,
  pub created_at: u64,
  pub generation: u64,
  pub digest: String,
  pub target_count: usize,
  pub library_count: usize,
}

/// On-disk index of stored snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotIndex {
  pub version: u32,
  /// Snapshot currently handed to tooling.
  pub current: Option<String>,
  /// Set when the last pass failed and `current` no longer reflects the build.
  #[serde(default)]
  pub stale: bool,
  /// Oldest first.
  pub snapshots: Vec<SnapshotMetadata>,
}

impl Default for SnapshotIndex {
  fn default() -> Self {
    Self::new()
  }
}

impl SnapshotIndex {
  pub fn new() -> Self {
    Self {
      version: SNAPSHOT_INDEX_VERSION,
      current: None,
      stale: false,
      snapshots: Vec::new(),
    }
  }

  pub fn len(&self) -> usize {
    self.snapshots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.snapshots.is_empty()
  }

  pub fn get(&self, id: &str) -> Option<&SnapshotMetadata> {
    self.snapshots.iter().find(|s| s.id == id)
  }

  /// Insert or replace an entry, keeping the list ordered by creation time.
  pub fn add(&mut self, metadata: SnapshotMetadata) {
    self.snapshots.retain(|s| s.id != metadata.id);
    let pos = self
      .snapshots
      .partition_point(|s| (s.created_at, s.generation) <= (metadata.created_at, metadata.generation));
    self.snapshots.insert(pos, metadata);
  }

  /// Remove an entry. Clears `current` if it pointed at the removed snapshot.
  pub fn remove(&mut self, id: &str) -> Option<SnapshotMetadata> {
    let pos = self.snapshots.iter().position(|s| s.id == id)?;
    if self.current.as_deref() == Some(id) {
      self.current = None;
    }
    Some(self.snapshots.remove(pos))
  }

  pub fn set_current(&mut self, id: &str) -> Result<(), SnapshotError> {
    if self.get(id).is_none() {
      return Err(SnapshotError::NotFound(id.to_string()));
    }
    self.current = Some(id.to_string());
    Ok(())
  }
}

static ID_SEQUENCE: AtomicU32 = AtomicU32::new(0);

/// Generate a snapshot id: creation time in milliseconds plus a per-process sequence, both hex.
pub fn generate_snapshot_id() -> String {
  let millis = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis())
    .unwrap_or_default();
  let seq = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed) & 0xffff;
  format!("{:x}-{:04x}", millis, seq)
}

fn unix_now() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_secs()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn metadata(id: &str, created_at: u64, generation: u64) -> SnapshotMetadata {
    SnapshotMetadata {
      id: id.to_string(),
      created_at,
      generation,
      digest: String::new(),
      target_count: 0,
      library_count: 0,
    }
  }

  #[test]
  fn snapshot_digest_matches_project() {
    let project = Project::default();
    let snapshot = ProjectSnapshot::new(3, 7, project.clone()).unwrap();

    assert_eq!(snapshot.digest, project.digest().unwrap());
    assert_eq!(snapshot.generation, 3);
    assert_eq!(snapshot.to_metadata().target_count, 7);
  }

  #[test]
  fn ids_are_unique_within_a_millisecond() {
    let ids: std::collections::HashSet<_> = (0..100).map(|_| generate_snapshot_id()).collect();
    assert_eq!(ids.len(), 100);
  }

  #[test]
  fn index_keeps_creation_order() {
    let mut index = SnapshotIndex::new();
    index.add(metadata("b", 2000, 1));
    index.add(metadata("a", 1000, 1));
    index.add(metadata("c", 2000, 2));

    let ids: Vec<_> = index.snapshots.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
  }

  #[test]
  fn re_adding_replaces_entry() {
    let mut index = SnapshotIndex::new();
    index.add(metadata("a", 1000, 1));
    index.add(metadata("a", 1000, 1));
    assert_eq!(index.len(), 1);
  }

  #[test]
  fn removing_current_clears_pointer() {
    let mut index = SnapshotIndex::new();
    index.add(metadata("a", 1000, 1));
    index.set_current("a").unwrap();

    assert!(index.remove("a").is_some());
    assert!(index.current.is_none());
    assert!(index.remove("a").is_none());
  }

  #[test]
  fn set_current_requires_entry() {
    let mut index = SnapshotIndex::new();
    assert!(matches!(index.set_current("missing"), Err(SnapshotError::NotFound(_))));
  }

  #[test]
  fn stale_defaults_to_false_when_absent() {
    let index: SnapshotIndex = serde_json::from_str(r#"{"version": 1, "current": null, "snapshots": []}"#).unwrap();
    assert!(!index.stale);
  }
}
