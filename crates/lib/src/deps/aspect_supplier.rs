//! Supplier backed by aspect output files.
//!
//! Output files (`*.qsync.json`) are discovered recursively below the output
//! directory and read in sorted path order, so the resulting target list is
//! deterministic regardless of how the reads were scheduled.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::artifact::TargetBuildInfo;
use crate::artifact::aspect::{read_aspect_file, read_aspect_file_async};
use crate::consts::{ASPECT_OUTPUT_SUFFIX, DEFAULT_PARALLELISM};

use super::{BuildError, BuiltDependenciesSupplier, MalformedPolicy};

type FileResult = (usize, Result<Vec<TargetBuildInfo>, BuildError>);

/// Reads built targets from the aspect output directory.
///
/// Call [`prefetch`](Self::prefetch) from async code to read all files
/// concurrently before a pass starts; [`get`](BuiltDependenciesSupplier::get)
/// then serves the memoized result. Without a prefetch, `get` falls back to a
/// sequential read. Either way the result is memoized until `invalidate`.
#[derive(Debug)]
pub struct AspectOutputSupplier {
  output_dir: PathBuf,
  policy: MalformedPolicy,
  parallelism: usize,
  cancel: CancellationToken,
  cache: Mutex<Option<Arc<[TargetBuildInfo]>>>,
}

impl AspectOutputSupplier {
  pub fn new(output_dir: impl Into<PathBuf>) -> Self {
    Self {
      output_dir: output_dir.into(),
      policy: MalformedPolicy::default(),
      parallelism: DEFAULT_PARALLELISM,
      cancel: CancellationToken::new(),
      cache: Mutex::new(None),
    }
  }

  pub fn with_policy(mut self, policy: MalformedPolicy) -> Self {
    self.policy = policy;
    self
  }

  /// Maximum number of files read at once by [`prefetch`](Self::prefetch). Clamped to at least 1.
  pub fn with_parallelism(mut self, parallelism: usize) -> Self {
    self.parallelism = parallelism.max(1);
    self
  }

  /// Share the cancellation signal of the enclosing pass.
  pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
    self.cancel = cancel;
    self
  }

  /// Whether a result is currently memoized.
  pub fn is_loaded(&self) -> bool {
    self.cache.lock().unwrap_or_else(PoisonError::into_inner).is_some()
  }

  /// Read every output file concurrently and memoize the result.
  pub async fn prefetch(&self) -> Result<Arc<[TargetBuildInfo]>, BuildError> {
    let files = self.discover()?;
    info!(
      dir = %self.output_dir.display(),
      files = files.len(),
      parallelism = self.parallelism,
      "reading aspect output"
    );

    let semaphore = Arc::new(Semaphore::new(self.parallelism));
    let mut join_set: JoinSet<FileResult> = JoinSet::new();

    for (index, path) in files.iter().enumerate() {
      let path = path.clone();
      let policy = self.policy;
      let semaphore = semaphore.clone();

      join_set.spawn(async move {
        let _permit = match semaphore.acquire_owned().await {
          Ok(permit) => permit,
          Err(_) => return (index, Err(BuildError::Interrupted)),
        };
        (index, read_aspect_file_async(&path, policy).await)
      });
    }

    let mut per_file: Vec<Option<Vec<TargetBuildInfo>>> = vec![None; files.len()];

    loop {
      let joined = tokio::select! {
        biased;
        _ = self.cancel.cancelled() => {
          join_set.abort_all();
          return Err(BuildError::Interrupted);
        }
        joined = join_set.join_next() => joined,
      };

      let Some(joined) = joined else { break };
      match joined {
        Ok((index, Ok(targets))) => per_file[index] = Some(targets),
        Ok((_, Err(e))) => {
          join_set.abort_all();
          return Err(e);
        }
        Err(e) => {
          join_set.abort_all();
          return Err(BuildError::unavailable(&self.output_dir, format!("reader task failed: {}", e)));
        }
      }
    }

    let targets = merge_targets(per_file.into_iter().flatten());
    self.store(targets)
  }

  fn load_blocking(&self) -> Result<Arc<[TargetBuildInfo]>, BuildError> {
    let files = self.discover()?;
    debug!(dir = %self.output_dir.display(), files = files.len(), "reading aspect output sequentially");

    let mut per_file = Vec::with_capacity(files.len());
    for path in &files {
      if self.cancel.is_cancelled() {
        return Err(BuildError::Interrupted);
      }
      per_file.push(read_aspect_file(path, self.policy)?);
    }

    Ok(merge_targets(per_file).into())
  }

  fn store(&self, targets: Vec<TargetBuildInfo>) -> Result<Arc<[TargetBuildInfo]>, BuildError> {
    let targets: Arc<[TargetBuildInfo]> = targets.into();
    *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = Some(targets.clone());
    Ok(targets)
  }

  /// List output files below the output directory in sorted order.
  fn discover(&self) -> Result<Vec<PathBuf>, BuildError> {
    if !self.output_dir.is_dir() {
      return Err(BuildError::unavailable(&self.output_dir, "directory not found"));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&self.output_dir).follow_links(true) {
      let entry = entry.map_err(|e| BuildError::unavailable(&self.output_dir, e))?;
      let is_output = entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.ends_with(ASPECT_OUTPUT_SUFFIX));
      if entry.file_type().is_file() && is_output {
        files.push(entry.into_path());
      }
    }

    files.sort();
    Ok(files)
  }
}

impl BuiltDependenciesSupplier for AspectOutputSupplier {
  fn get(&self) -> Result<Arc<[TargetBuildInfo]>, BuildError> {
    let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(targets) = cache.as_ref() {
      return Ok(targets.clone());
    }

    let targets = self.load_blocking()?;
    *cache = Some(targets.clone());
    Ok(targets)
  }

  fn invalidate(&self) {
    *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = None;
  }
}

/// Flatten per-file targets, keeping the first occurrence of each label.
fn merge_targets(per_file: impl IntoIterator<Item = Vec<TargetBuildInfo>>) -> Vec<TargetBuildInfo> {
  let mut seen = HashSet::new();
  let mut merged = Vec::new();

  for target in per_file.into_iter().flatten() {
    if seen.insert(target.label.clone()) {
      merged.push(target);
    } else {
      debug!(label = %target.label, "ignoring duplicate target in aspect output");
    }
  }

  merged
}
