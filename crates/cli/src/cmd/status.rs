//! Status command implementation.
//!
//! Displays the current snapshot and whether it is stale.

use std::time::{Duration, UNIX_EPOCH};

use anyhow::Result;
use serde::Serialize;

use qsync_lib::snapshot::SnapshotStore;
use qsync_lib::store_lock::StoreLock;

use crate::output::{OutputFormat, print_info, print_json, print_stat, print_success, print_warning, truncate_hash};

#[derive(Debug, Serialize)]
struct StatusOutput {
  snapshot_id: Option<String>,
  stale: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  generation: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  created_at: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  digest: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  target_count: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  library_count: Option<usize>,
}

pub fn cmd_status(output: OutputFormat) -> Result<()> {
  let store = SnapshotStore::default_store();
  let (index, snapshot) = {
    let _lock = StoreLock::shared()?;
    (store.load_index()?, store.load_current()?)
  };

  if output.is_json() {
    return print_json(&StatusOutput {
      snapshot_id: snapshot.as_ref().map(|s| s.id.clone()),
      stale: index.stale,
      generation: snapshot.as_ref().map(|s| s.generation),
      created_at: snapshot.as_ref().map(|s| s.created_at),
      digest: snapshot.as_ref().map(|s| s.digest.clone()),
      target_count: snapshot.as_ref().map(|s| s.target_count),
      library_count: snapshot.as_ref().map(|s| s.project.libraries.len()),
    });
  }

  let Some(snapshot) = snapshot else {
    print_info("No snapshot found. Run 'qsync sync' to create one.");
    return Ok(());
  };

  print_success(&format!("Current snapshot: {}", snapshot.id));
  let created = UNIX_EPOCH + Duration::from_secs(snapshot.created_at);
  print_stat("Created", &humantime::format_rfc3339_seconds(created).to_string());
  print_stat("Generation", &snapshot.generation.to_string());
  print_stat("Digest", truncate_hash(&snapshot.digest));
  println!();
  print_stat("Targets", &snapshot.target_count.to_string());
  print_stat("Libraries", &snapshot.project.libraries.len().to_string());
  print_stat(
    "Source packages",
    &snapshot.project.workspace_module.android_source_packages.len().to_string(),
  );
  print_stat(
    "Generated roots",
    &snapshot.project.workspace_module.generated_source_roots.len().to_string(),
  );

  if index.stale {
    println!();
    print_warning("The last sync failed; this snapshot may not reflect the latest build.");
  }

  Ok(())
}
