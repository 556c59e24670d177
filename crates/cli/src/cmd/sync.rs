//! Implementation of the `qsync sync` command.
//!
//! Reads the aspect output, runs one pass of the default update operations on
//! top of the base project, and commits the result to the snapshot store. A
//! failed pass keeps the previous snapshot and flags it stale.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use clap::Args;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use qsync_lib::config::SyncConfig;
use qsync_lib::deps::{AspectOutputSupplier, BuildError, MalformedPolicy};
use qsync_lib::project::Project;
use qsync_lib::snapshot::SnapshotStore;
use qsync_lib::store_lock::StoreLock;
use qsync_lib::sync::{ProjectSync, SyncError};

use crate::output::{
  OutputFormat, format_duration, print_info, print_json, print_stat, print_success, print_warning, truncate_hash,
};

#[derive(Args, Debug)]
pub struct SyncArgs {
  /// Directory containing *.qsync.json aspect output (overrides config)
  #[arg(long)]
  pub aspect_output: Option<PathBuf>,

  /// Base project JSON the pass builds on (default: empty project)
  #[arg(long)]
  pub base: Option<PathBuf>,

  /// What to do with malformed target metadata: abort or skip (overrides config)
  #[arg(long, value_parser = parse_policy)]
  pub on_malformed: Option<MalformedPolicy>,

  /// Concurrent aspect output reads (overrides config)
  #[arg(short = 'j', long)]
  pub parallelism: Option<usize>,

  /// Output format
  #[arg(short = 'o', long, value_enum, default_value = "text")]
  pub output: OutputFormat,
}

fn parse_policy(value: &str) -> Result<MalformedPolicy, String> {
  match value {
    "abort" => Ok(MalformedPolicy::Abort),
    "skip" => Ok(MalformedPolicy::Skip),
    other => Err(format!("expected `abort` or `skip`, got `{}`", other)),
  }
}

#[derive(Debug, Serialize)]
struct SyncOutput {
  snapshot_id: String,
  generation: u64,
  digest: String,
  changed: bool,
  target_count: usize,
  library_count: usize,
  android_source_packages: usize,
  elapsed_ms: u128,
}

pub fn cmd_sync(args: SyncArgs, config: &SyncConfig) -> Result<()> {
  let start = Instant::now();

  let output_dir = args
    .aspect_output
    .or_else(|| config.aspect_output_dir.clone())
    .ok_or_else(|| anyhow!("no aspect output directory: pass --aspect-output or set `aspect_output_dir` in the config"))?;
  let policy = args.on_malformed.unwrap_or(config.on_malformed);
  let parallelism = args.parallelism.unwrap_or(config.parallelism);

  let base = match &args.base {
    Some(path) => Project::load(path)?,
    None => Project::default(),
  };

  let _lock = StoreLock::exclusive("sync")?;
  let store = SnapshotStore::default_store();

  let cancel = CancellationToken::new();
  let supplier = Arc::new(
    AspectOutputSupplier::new(&output_dir)
      .with_policy(policy)
      .with_parallelism(parallelism)
      .with_cancellation(cancel.clone()),
  );

  let mut sync = ProjectSync::new(supplier.clone(), base)?.with_default_operations(policy);
  let previous = store.load_current().context("Failed to load current snapshot")?;
  if let Some(previous) = &previous {
    debug!(id = %previous.id, generation = previous.generation, "resuming from current snapshot");
    sync = sync.resume(previous.clone(), store.is_stale()?);
  }

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let prefetched = rt.block_on(async {
    tokio::select! {
      result = supplier.prefetch() => result,
      _ = tokio::signal::ctrl_c() => {
        cancel.cancel();
        Err(BuildError::Interrupted)
      }
    }
  });
  match prefetched {
    Ok(targets) => info!(targets = targets.len(), dir = %output_dir.display(), "prefetched aspect output"),
    Err(BuildError::Interrupted) => {
      print_warning("Sync cancelled; the current snapshot is unchanged");
      return Err(SyncError::Cancelled.into());
    }
    Err(err) => {
      store.mark_stale().context("Failed to mark snapshot stale")?;
      return Err(SyncError::Supplier(err)).context("Sync pass failed; the previous snapshot is kept and marked stale");
    }
  }

  let snapshot = match sync.run_pass(&cancel) {
    Ok(snapshot) => snapshot,
    Err(SyncError::Cancelled) => {
      print_warning("Sync cancelled; the current snapshot is unchanged");
      return Err(SyncError::Cancelled.into());
    }
    Err(err) => {
      store.mark_stale().context("Failed to mark snapshot stale")?;
      return Err(err).context("Sync pass failed; the previous snapshot is kept and marked stale");
    }
  };

  store
    .save_and_set_current(&snapshot)
    .context("Failed to save snapshot")?;

  let changed = previous.as_ref().is_none_or(|p| p.digest != snapshot.digest);
  let result = SyncOutput {
    snapshot_id: snapshot.id.clone(),
    generation: snapshot.generation,
    digest: snapshot.digest.clone(),
    changed,
    target_count: snapshot.target_count,
    library_count: snapshot.project.libraries.len(),
    android_source_packages: snapshot.project.workspace_module.android_source_packages.len(),
    elapsed_ms: start.elapsed().as_millis(),
  };

  if args.output.is_json() {
    print_json(&result)?;
  } else {
    print_success(&format!(
      "Committed snapshot {} (generation {})",
      result.snapshot_id, result.generation
    ));
    print_stat("Targets", &result.target_count.to_string());
    print_stat("Libraries", &result.library_count.to_string());
    print_stat("Source packages", &result.android_source_packages.to_string());
    print_stat("Digest", truncate_hash(&result.digest));
    print_stat("Elapsed", &format_duration(start.elapsed()));
    if !changed {
      print_info("Project unchanged since the previous snapshot");
    }
  }

  Ok(())
}
