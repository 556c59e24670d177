//! Sync configuration (`config.toml`).
//!
//! ```toml
//! aspect_output_dir = "bazel-out/qsync"
//! parallelism = 8
//! on_malformed = "skip"
//!
//! [formatter]
//! binary = "/usr/local/bin/buildifier"
//! timeout_secs = 10
//! ```
//!
//! Every key is optional. A missing default file yields the defaults; a
//! missing explicitly requested file is an error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{DEFAULT_FORMATTER_TIMEOUT_SECS, DEFAULT_PARALLELISM};
use crate::deps::MalformedPolicy;
use crate::platform::paths::config_file;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("config file not found: {}", .0.display())]
  NotFound(PathBuf),

  #[error("failed to read config file {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse config file {}: {source}", .path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("invalid value for `{field}`: {reason}")]
  InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatterConfig {
  /// Formatter executable. Looked up on `PATH` when unset.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub binary: Option<PathBuf>,
  pub timeout_secs: u64,
}

impl Default for FormatterConfig {
  fn default() -> Self {
    Self {
      binary: None,
      timeout_secs: DEFAULT_FORMATTER_TIMEOUT_SECS,
    }
  }
}

impl FormatterConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
  /// Directory holding `*.qsync.json` aspect output.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub aspect_output_dir: Option<PathBuf>,
  /// Concurrent aspect output reads.
  pub parallelism: usize,
  pub on_malformed: MalformedPolicy,
  pub formatter: FormatterConfig,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      aspect_output_dir: None,
      parallelism: DEFAULT_PARALLELISM,
      on_malformed: MalformedPolicy::default(),
      formatter: FormatterConfig::default(),
    }
  }
}

impl SyncConfig {
  /// Load and validate the config at `path`.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| {
      if source.kind() == io::ErrorKind::NotFound {
        ConfigError::NotFound(path.to_path_buf())
      } else {
        ConfigError::Read {
          path: path.to_path_buf(),
          source,
        }
      }
    })?;

    let config = Self::parse(&content).map_err(|e| match e {
      ConfigError::Parse { source, .. } => ConfigError::Parse {
        path: path.to_path_buf(),
        source,
      },
      other => other,
    })?;

    debug!(path = %path.display(), "loaded config");
    Ok(config)
  }

  /// Load `{config_dir}/config.toml`, or the defaults if it does not exist.
  pub fn load_default() -> Result<Self, ConfigError> {
    match Self::load(&config_file()) {
      Err(ConfigError::NotFound(path)) => {
        debug!(path = %path.display(), "no config file, using defaults");
        Ok(Self::default())
      }
      other => other,
    }
  }

  /// Load `path` if given, else the default config file.
  pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
    match path {
      Some(path) => Self::load(path),
      None => Self::load_default(),
    }
  }

  pub fn parse(content: &str) -> Result<Self, ConfigError> {
    let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
      path: PathBuf::new(),
      source,
    })?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.parallelism == 0 {
      return Err(ConfigError::InvalidValue {
        field: "parallelism",
        reason: "must be at least 1".to_string(),
      });
    }
    if self.formatter.timeout_secs == 0 {
      return Err(ConfigError::InvalidValue {
        field: "formatter.timeout_secs",
        reason: "must be at least 1".to_string(),
      });
    }
    Ok(())
  }
}
