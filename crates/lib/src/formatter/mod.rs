//! BUILD file formatting through an external formatter (`buildifier`).
//!
//! The formatter reads the file contents on stdin and writes the formatted
//! text to stdout. It is told whether it is formatting a BUILD file or a
//! Starlark extension with `--type=build` / `--type=bzl`.

use std::fmt;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::consts::DEFAULT_FORMATTER_TIMEOUT_SECS;

const DEFAULT_BINARY: &str = "buildifier";

#[derive(Debug, Error)]
pub enum FormatError {
  #[error("formatter binary `{0}` not found on PATH")]
  NotFound(String),

  #[error("failed to start formatter {}: {source}", .binary.display())]
  Spawn {
    binary: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("formatter I/O failed: {0}")]
  Io(#[from] io::Error),

  #[error("formatter timed out after {0:?}")]
  Timeout(Duration),

  #[error("formatter exited with {}: {stderr}", .code.map_or_else(|| "a signal".to_string(), |c| format!("code {}", c)))]
  Failed { code: Option<i32>, stderr: String },

  #[error("formatter produced invalid UTF-8")]
  InvalidOutput,

  #[error("range {start}..{end} is not valid for text of length {len}")]
  InvalidRange { start: usize, end: usize, len: usize },

  #[error("ranges {first:?} and {second:?} overlap")]
  OverlappingRanges { first: Range<usize>, second: Range<usize> },
}

/// Kind of file being formatted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildFileType {
  /// `BUILD`, `BUILD.bazel`, `WORKSPACE` and similar.
  #[default]
  Build,
  /// Starlark extension (`.bzl`).
  Bzl,
}

impl BuildFileType {
  pub fn from_path(path: &Path) -> Self {
    match path.extension().and_then(|ext| ext.to_str()) {
      Some("bzl") => BuildFileType::Bzl,
      _ => BuildFileType::Build,
    }
  }

  pub fn arg(self) -> &'static str {
    match self {
      BuildFileType::Build => "--type=build",
      BuildFileType::Bzl => "--type=bzl",
    }
  }
}

impl fmt::Display for BuildFileType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildFileType::Build => write!(f, "build"),
      BuildFileType::Bzl => write!(f, "bzl"),
    }
  }
}

/// Formatted text for one byte range of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
  pub range: Range<usize>,
  pub original: String,
  pub formatted: String,
}

impl Replacement {
  pub fn is_change(&self) -> bool {
    self.original != self.formatted
  }
}

/// Apply non-overlapping replacements to `text`.
pub fn apply_replacements(text: &str, replacements: &[Replacement]) -> String {
  let mut ordered: Vec<&Replacement> = replacements.iter().collect();
  ordered.sort_by_key(|r| r.range.start);

  let mut out = String::with_capacity(text.len());
  let mut pos = 0;
  for replacement in ordered {
    if replacement.range.start < pos {
      warn!(start = replacement.range.start, "skipping overlapping replacement");
      continue;
    }
    out.push_str(&text[pos..replacement.range.start]);
    out.push_str(&replacement.formatted);
    pos = replacement.range.end;
  }
  out.push_str(&text[pos..]);
  out
}

#[derive(Debug, Clone)]
pub struct BuildFileFormatter {
  binary: PathBuf,
  execution_root: Option<PathBuf>,
  timeout: Duration,
}

impl BuildFileFormatter {
  pub fn new(binary: impl Into<PathBuf>) -> Self {
    Self {
      binary: binary.into(),
      execution_root: None,
      timeout: Duration::from_secs(DEFAULT_FORMATTER_TIMEOUT_SECS),
    }
  }

  /// Working directory of the formatter process.
  pub fn with_execution_root(mut self, root: impl Into<PathBuf>) -> Self {
    self.execution_root = Some(root.into());
    self
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Use the configured binary, or find `buildifier` on `PATH`.
  pub fn locate(config: &SyncConfig) -> Result<Self, FormatError> {
    let binary = match &config.formatter.binary {
      Some(binary) => binary.clone(),
      None => which::which(DEFAULT_BINARY).map_err(|e| {
        debug!(error = %e, "formatter lookup failed");
        FormatError::NotFound(DEFAULT_BINARY.to_string())
      })?,
    };
    debug!(binary = %binary.display(), "using BUILD file formatter");
    Ok(Self::new(binary).with_timeout(config.formatter.timeout()))
  }

  pub fn binary(&self) -> &Path {
    &self.binary
  }

  /// Format `text` as a whole.
  pub async fn format(&self, text: &str, file_type: BuildFileType) -> Result<String, FormatError> {
    let mut command = Command::new(&self.binary);
    command
      .arg(file_type.arg())
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);
    if let Some(root) = &self.execution_root {
      command.current_dir(root);
    }

    debug!(binary = %self.binary.display(), %file_type, bytes = text.len(), "running formatter");

    let mut child = command.spawn().map_err(|source| FormatError::Spawn {
      binary: self.binary.clone(),
      source,
    })?;
    let mut stdin = child
      .stdin
      .take()
      .ok_or_else(|| FormatError::Io(io::Error::other("formatter stdin not captured")))?;

    let write = async move {
      let result = stdin.write_all(text.as_bytes()).await;
      drop(stdin);
      result
    };
    let run = async { tokio::join!(write, child.wait_with_output()) };

    let (written, output) = tokio::time::timeout(self.timeout, run)
      .await
      .map_err(|_| FormatError::Timeout(self.timeout))?;
    let output = output?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
      debug!(code = ?output.status.code(), stderr = %stderr, "formatter failed");
      return Err(FormatError::Failed {
        code: output.status.code(),
        stderr,
      });
    }

    if let Err(e) = written
      && e.kind() != io::ErrorKind::BrokenPipe
    {
      return Err(FormatError::Io(e));
    }

    String::from_utf8(output.stdout).map_err(|_| FormatError::InvalidOutput)
  }

  /// Format each byte range of `text` independently.
  ///
  /// Fails on the first invalid range or formatter failure; no partial result is returned.
  pub async fn replacements(
    &self,
    text: &str,
    ranges: &[Range<usize>],
    file_type: BuildFileType,
  ) -> Result<Vec<Replacement>, FormatError> {
    for range in ranges {
      check_range(text, range)?;
    }
    check_disjoint(ranges)?;

    let mut replacements = Vec::with_capacity(ranges.len());
    for range in ranges {
      let original = &text[range.clone()];
      let formatted = self.format(original, file_type).await?;
      replacements.push(Replacement {
        range: range.clone(),
        original: original.to_string(),
        formatted,
      });
    }
    Ok(replacements)
  }
}

/// Ranges may come in any order but must not overlap.
fn check_disjoint(ranges: &[Range<usize>]) -> Result<(), FormatError> {
  let mut sorted: Vec<&Range<usize>> = ranges.iter().collect();
  sorted.sort_by_key(|r| (r.start, r.end));
  for pair in sorted.windows(2) {
    if pair[1].start < pair[0].end {
      return Err(FormatError::OverlappingRanges {
        first: pair[0].clone(),
        second: pair[1].clone(),
      });
    }
  }
  Ok(())
}

fn check_range(text: &str, range: &Range<usize>) -> Result<(), FormatError> {
  let valid = range.start <= range.end
    && range.end <= text.len()
    && text.is_char_boundary(range.start)
    && text.is_char_boundary(range.end);
  if valid {
    Ok(())
  } else {
    Err(FormatError::InvalidRange {
      start: range.start,
      end: range.end,
      len: text.len(),
    })
  }
}
