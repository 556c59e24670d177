use serde::Serialize;
use thiserror::Error;

use crate::deps::BuildError;

#[derive(Debug, Error)]
pub enum SyncError {
  /// An update operation failed; nothing was committed.
  #[error("update operation `{operation}` failed: {source}")]
  Build {
    operation: String,
    #[source]
    source: BuildError,
  },

  /// The set of built targets could not be produced; nothing was committed.
  #[error("failed to collect built targets: {0}")]
  Supplier(#[source] BuildError),

  /// The pass was cancelled; nothing was committed.
  #[error("sync pass cancelled")]
  Cancelled,

  #[error("failed to serialize project: {0}")]
  Snapshot(#[source] serde_json::Error),
}

impl SyncError {
  /// Map a supplier or operation failure, turning interruption into cancellation.
  pub(crate) fn from_build(operation: Option<&str>, source: BuildError) -> Self {
    if source.is_interrupted() {
      return SyncError::Cancelled;
    }
    match operation {
      Some(operation) => SyncError::Build {
        operation: operation.to_string(),
        source,
      },
      None => SyncError::Supplier(source),
    }
  }

  pub fn is_cancelled(&self) -> bool {
    matches!(self, SyncError::Cancelled)
  }
}

/// Point-in-time view of a [`ProjectSync`](super::ProjectSync).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
  pub snapshot_id: String,
  pub generation: u64,
  pub digest: String,
  pub target_count: usize,
  /// The last pass failed and the snapshot no longer reflects the build.
  pub stale: bool,
}
