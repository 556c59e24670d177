use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn test_snapshot_list_empty() {
  let env = TestEnv::new();

  env
    .qsync_cmd()
    .args(["snapshot", "list"])
    .assert()
    .success()
    .stdout(predicate::str::contains("No snapshots"));
}

#[test]
fn test_snapshot_list_marks_current() {
  let env = TestEnv::with_app_output();
  let first = env.sync_json();
  let second = env.sync_json();

  let output = env.qsync_cmd().args(["snapshot", "list"]).output().unwrap();
  assert!(output.status.success());

  let stdout = String::from_utf8_lossy(&output.stdout);
  let current = format!("{} (current)", second["snapshot_id"].as_str().unwrap());
  assert!(stdout.contains(&current), "{}", stdout);
  assert!(stdout.contains(first["snapshot_id"].as_str().unwrap()));
  assert!(stdout.contains("2 snapshot(s) total"));
}

#[test]
fn test_snapshot_list_json() {
  let env = TestEnv::with_app_output();
  let committed = env.sync_json();

  let output = env.qsync_cmd().args(["snapshot", "list", "-o", "json"]).output().unwrap();
  assert!(output.status.success());

  let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(listed["current"], committed["snapshot_id"]);
  assert_eq!(listed["stale"], false);
  let snapshots = listed["snapshots"].as_array().unwrap();
  assert_eq!(snapshots.len(), 1);
  assert_eq!(snapshots[0]["is_current"], true);
  assert_eq!(snapshots[0]["target_count"], 3);
  assert_eq!(snapshots[0]["library_count"], 1);
}

#[test]
fn test_snapshot_show() {
  let env = TestEnv::with_app_output();
  let committed = env.sync_json();
  let id = committed["snapshot_id"].as_str().unwrap();

  env
    .qsync_cmd()
    .args(["snapshot", "show", id, "--verbose"])
    .assert()
    .success()
    .stdout(predicate::str::contains("(current)"))
    .stdout(predicate::str::contains("com.example.util"))
    .stdout(predicate::str::contains("NDEBUG"));
}

#[test]
fn test_snapshot_show_json_includes_project() {
  let env = TestEnv::with_app_output();
  let committed = env.sync_json();
  let id = committed["snapshot_id"].as_str().unwrap();

  let output = env.qsync_cmd().args(["snapshot", "show", id, "-o", "json"]).output().unwrap();
  assert!(output.status.success());

  let snapshot: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(snapshot["digest"], committed["digest"]);
  let packages = &snapshot["project"]["workspace_module"]["android_source_packages"];
  assert_eq!(packages, &serde_json::json!(["com.example.app", "com.example.util"]));
}

#[test]
fn test_snapshot_show_unknown_fails() {
  let env = TestEnv::new();

  env
    .qsync_cmd()
    .args(["snapshot", "show", "does-not-exist"])
    .assert()
    .failure();
}

#[test]
fn test_snapshot_delete_old() {
  let env = TestEnv::with_app_output();
  let first = env.sync_json();
  let second = env.sync_json();
  let first_id = first["snapshot_id"].as_str().unwrap();

  env
    .qsync_cmd()
    .args(["snapshot", "delete", first_id, "--force"])
    .assert()
    .success();

  let output = env.qsync_cmd().args(["snapshot", "list", "-o", "json"]).output().unwrap();
  let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let snapshots = listed["snapshots"].as_array().unwrap();
  assert_eq!(snapshots.len(), 1);
  assert_eq!(snapshots[0]["id"], second["snapshot_id"]);
}

#[test]
fn test_snapshot_delete_skips_current() {
  let env = TestEnv::with_app_output();
  let committed = env.sync_json();
  let id = committed["snapshot_id"].as_str().unwrap();

  let output = env
    .qsync_cmd()
    .args(["snapshot", "delete", id, "--force", "-o", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(result["skipped_current"], committed["snapshot_id"]);
  assert_eq!(result["deleted"], serde_json::json!([]));
  assert_eq!(env.status_json()["snapshot_id"], committed["snapshot_id"]);
}

#[test]
fn test_snapshot_delete_dry_run() {
  let env = TestEnv::with_app_output();
  let first = env.sync_json();
  env.sync_json();
  let first_id = first["snapshot_id"].as_str().unwrap();

  env
    .qsync_cmd()
    .args(["snapshot", "delete", first_id, "--dry-run"])
    .assert()
    .success()
    .stdout(predicate::str::contains("no changes made"));

  env
    .qsync_cmd()
    .args(["snapshot", "show", first_id])
    .assert()
    .success();
}
