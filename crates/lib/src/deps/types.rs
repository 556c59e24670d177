//! Error and policy types shared by suppliers and update operations.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// The single failure kind surfaced by suppliers and update operations.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
  /// The set of built targets could not be produced (missing or unreadable output).
  #[error("build output unavailable at {}: {message}", .path.display())]
  OutputUnavailable { path: PathBuf, message: String },

  /// One target's metadata could not be understood.
  #[error("malformed artifact info for {target}: {message}")]
  MalformedArtifactInfo { target: String, message: String },

  /// Cancellation was requested while gathering build outputs.
  #[error("interrupted while reading build output")]
  Interrupted,
}

impl BuildError {
  pub fn unavailable(path: &Path, message: impl fmt::Display) -> Self {
    BuildError::OutputUnavailable {
      path: path.to_path_buf(),
      message: message.to_string(),
    }
  }

  pub fn malformed(target: impl fmt::Display, message: impl Into<String>) -> Self {
    BuildError::MalformedArtifactInfo {
      target: target.to_string(),
      message: message.into(),
    }
  }

  pub fn is_interrupted(&self) -> bool {
    matches!(self, BuildError::Interrupted)
  }
}

/// What to do when one target's metadata is malformed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
  /// Fail the whole pass.
  #[default]
  Abort,
  /// Drop the offending entry, log a warning and continue.
  Skip,
}

impl MalformedPolicy {
  /// Apply the policy to a malformed-entry error.
  ///
  /// `Abort` hands the error back; `Skip` logs it and returns `Ok(())`.
  pub fn handle(self, err: BuildError) -> Result<(), BuildError> {
    match self {
      MalformedPolicy::Abort => Err(err),
      MalformedPolicy::Skip => {
        warn!(error = %err, "skipping malformed artifact info");
        Ok(())
      }
    }
  }
}

impl fmt::Display for MalformedPolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MalformedPolicy::Abort => write!(f, "abort"),
      MalformedPolicy::Skip => write!(f, "skip"),
    }
  }
}
