use std::io::{self, IsTerminal, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Result, bail};
use clap::Subcommand;
use serde::Serialize;
use tracing::{debug, info};

use qsync_lib::snapshot::SnapshotStore;
use qsync_lib::store_lock::StoreLock;

use crate::output::{
  OutputFormat, print_error, print_info, print_json, print_stat, print_success, print_warning, truncate_hash,
};

#[derive(Subcommand, Debug)]
pub enum SnapshotCommand {
  /// List all snapshots
  List {
    /// Show digest and counts
    #[arg(short, long)]
    verbose: bool,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Show details of a specific snapshot
  Show {
    /// Snapshot ID to show
    id: String,

    /// List the project contents
    #[arg(short, long)]
    verbose: bool,

    /// Output format (json prints the full snapshot)
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Delete snapshots
  Delete {
    /// Snapshot IDs to delete
    ids: Vec<String>,

    /// Delete snapshots older than this duration (e.g., "7d", "24h", "2w")
    #[arg(long, value_parser = humantime::parse_duration)]
    older_than: Option<Duration>,

    /// Preview what would be deleted without actually deleting
    #[arg(long)]
    dry_run: bool,

    /// Skip confirmation prompt
    #[arg(long)]
    force: bool,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },
}

#[derive(Debug, Default, Serialize)]
struct DeleteResult {
  deleted: Vec<String>,
  failed: Vec<DeleteFailure>,
  skipped_current: Option<String>,
  dry_run: bool,
}

#[derive(Debug, Serialize)]
struct DeleteFailure {
  id: String,
  error: String,
}

pub fn cmd_snapshot(command: SnapshotCommand) -> Result<()> {
  match command {
    SnapshotCommand::List { verbose, output } => cmd_list(verbose, output),
    SnapshotCommand::Show { id, verbose, output } => cmd_show(&id, verbose, output),
    SnapshotCommand::Delete {
      ids,
      older_than,
      dry_run,
      force,
      output,
    } => cmd_delete(ids, older_than, dry_run, force, output),
  }
}

fn cmd_list(verbose: bool, output: OutputFormat) -> Result<()> {
  let store = SnapshotStore::default_store();
  let index = {
    let _lock = StoreLock::shared()?;
    store.load_index()?
  };

  let mut snapshots = index.snapshots;
  snapshots.reverse();

  if output.is_json() {
    #[derive(Serialize)]
    struct ListOutput<'a> {
      snapshots: Vec<SnapshotListItem<'a>>,
      current: Option<&'a str>,
      stale: bool,
    }

    #[derive(Serialize)]
    struct SnapshotListItem<'a> {
      id: &'a str,
      created_at: u64,
      generation: u64,
      digest: &'a str,
      is_current: bool,
      target_count: usize,
      library_count: usize,
    }

    let items = snapshots
      .iter()
      .map(|s| SnapshotListItem {
        id: &s.id,
        created_at: s.created_at,
        generation: s.generation,
        digest: &s.digest,
        is_current: index.current.as_ref() == Some(&s.id),
        target_count: s.target_count,
        library_count: s.library_count,
      })
      .collect();

    return print_json(&ListOutput {
      snapshots: items,
      current: index.current.as_deref(),
      stale: index.stale,
    });
  }

  if snapshots.is_empty() {
    print_info("No snapshots found");
    return Ok(());
  }

  for snapshot in &snapshots {
    let is_current = index.current.as_ref() == Some(&snapshot.id);
    let current_marker = match (is_current, index.stale) {
      (true, true) => " (current, stale)",
      (true, false) => " (current)",
      _ => "",
    };
    let timestamp = format_timestamp(snapshot.created_at);

    if verbose {
      println!(
        "{}{} - {} gen={} digest={} (targets: {}, libraries: {})",
        snapshot.id,
        current_marker,
        timestamp,
        snapshot.generation,
        truncate_hash(&snapshot.digest),
        snapshot.target_count,
        snapshot.library_count
      );
    } else {
      println!("{}{} - {}", snapshot.id, current_marker, timestamp);
    }
  }

  print_info(&format!("{} snapshot(s) total", snapshots.len()));
  Ok(())
}

fn cmd_show(id: &str, verbose: bool, output: OutputFormat) -> Result<()> {
  let store = SnapshotStore::default_store();
  let (snapshot, current_id) = {
    let _lock = StoreLock::shared()?;
    (store.load_snapshot(id)?, store.current_id()?)
  };

  if output.is_json() {
    return print_json(&snapshot);
  }

  let is_current = current_id.as_deref() == Some(id);
  let module = &snapshot.project.workspace_module;

  println!("Snapshot: {}{}", snapshot.id, if is_current { " (current)" } else { "" });
  print_stat("Created", &format_timestamp(snapshot.created_at));
  print_stat("Generation", &snapshot.generation.to_string());
  print_stat("Digest", &snapshot.digest);
  print_stat("Targets", &snapshot.target_count.to_string());
  print_stat("Libraries", &snapshot.project.libraries.len().to_string());
  print_stat("Source packages", &module.android_source_packages.len().to_string());

  if verbose {
    print_list("Android source packages", module.android_source_packages.iter());
    print_list("Generated source roots", module.generated_source_roots.iter().map(|p| p.display()));
    print_list("Generated source jars", module.generated_source_jars.iter().map(|p| p.display()));
    print_list("Android library aars", module.android_library_aars.iter().map(|p| p.display()));
    for library in &snapshot.project.libraries {
      print_list(
        &format!("Library {} (class jars)", library.name),
        library.class_jars.iter().map(|p| p.display()),
      );
      print_list(
        &format!("Library {} (source jars)", library.name),
        library.source_jars.iter().map(|p| p.display()),
      );
    }
    if let Some(cc) = &snapshot.project.cc_workspace {
      print_list("Include directories", cc.include_directories.iter().map(|p| p.display()));
      print_list("Defines", cc.defines.iter());
    }
  }

  Ok(())
}

fn print_list<T: std::fmt::Display>(title: &str, items: impl ExactSizeIterator<Item = T>) {
  if items.len() == 0 {
    return;
  }
  println!("\n{}:", title);
  for item in items {
    println!("  {}", item);
  }
}

fn cmd_delete(
  ids: Vec<String>,
  older_than: Option<Duration>,
  dry_run: bool,
  force: bool,
  output: OutputFormat,
) -> Result<()> {
  let store = SnapshotStore::default_store();

  let mut candidates: Vec<String> = ids;
  let current_id = store.current_id()?;

  if let Some(duration) = older_than {
    let now = SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .map(|d| d.as_secs())
      .unwrap_or(0);
    let cutoff = now.saturating_sub(duration.as_secs());

    for snapshot in store.list()? {
      if snapshot.created_at < cutoff && !candidates.contains(&snapshot.id) {
        candidates.push(snapshot.id);
      }
    }
  }

  let mut result = DeleteResult {
    dry_run,
    ..Default::default()
  };

  if let Some(current) = &current_id
    && candidates.contains(current)
  {
    result.skipped_current = Some(current.clone());
    candidates.retain(|id| id != current);
  }

  if candidates.is_empty() {
    if output.is_json() {
      print_json(&result)?;
    } else if result.skipped_current.is_some() {
      print_warning("Cannot delete the current snapshot.");
    } else {
      print_info("No snapshots to delete");
    }
    return Ok(());
  }

  if !output.is_json() {
    if dry_run {
      print_info("Dry run - the following snapshots would be deleted:");
    } else {
      println!("The following snapshots will be deleted:");
    }
    for id in &candidates {
      println!("  {}", id);
    }
    if let Some(current) = &result.skipped_current {
      print_warning(&format!("Skipping current snapshot: {}", current));
    }
  }

  if dry_run {
    result.deleted = candidates;
    if output.is_json() {
      print_json(&result)?;
    } else {
      print_info("Dry run - no changes made");
    }
    return Ok(());
  }

  if !force && !confirm_delete(candidates.len())? {
    if output.is_json() {
      print_json(&result)?;
    } else {
      print_info("Cancelled");
    }
    return Ok(());
  }

  let _lock = StoreLock::exclusive("snapshot delete")?;

  for id in candidates {
    debug!(snapshot_id = %id, "deleting snapshot");
    match store.delete_snapshot(&id) {
      Ok(()) => {
        info!(snapshot_id = %id, "deleted snapshot");
        result.deleted.push(id);
      }
      Err(e) => {
        debug!(snapshot_id = %id, error = %e, "failed to delete snapshot");
        result.failed.push(DeleteFailure {
          id,
          error: e.to_string(),
        });
      }
    }
  }

  if output.is_json() {
    print_json(&result)?;
  } else {
    if !result.deleted.is_empty() {
      print_success(&format!("Deleted {} snapshot(s)", result.deleted.len()));
    }
    for f in &result.failed {
      print_error(&format!("Failed to delete {}: {}", f.id, f.error));
    }
  }

  Ok(())
}

/// Ask on stderr before deleting. Refuses to guess when there is no terminal.
fn confirm_delete(count: usize) -> Result<bool> {
  if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
    bail!("Refusing to delete snapshots without confirmation in non-interactive mode; pass --force");
  }

  let mut stderr = io::stderr();
  write!(stderr, "Delete {} snapshot(s)? [y/N] ", count)?;
  stderr.flush()?;

  let mut answer = String::new();
  io::stdin().read_line(&mut answer)?;
  Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn format_timestamp(timestamp: u64) -> String {
  let datetime = UNIX_EPOCH + Duration::from_secs(timestamp);
  match SystemTime::now().duration_since(datetime) {
    Ok(elapsed) => {
      let rounded = Duration::from_secs(elapsed.as_secs());
      if rounded.is_zero() {
        "just now".to_string()
      } else {
        format!("{} ago", humantime::format_duration(rounded))
      }
    }
    Err(_) => humantime::format_rfc3339_seconds(datetime).to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamp_formatting() {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
    assert_eq!(format_timestamp(now + 3600).len(), "2030-01-01T00:00:00Z".len());
    assert!(format_timestamp(now - 90).ends_with(" ago"));
  }
}
