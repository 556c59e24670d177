use predicates::prelude::*;

use super::common::{APP_OUTPUT, TestEnv};

#[test]
fn test_sync_commits_snapshot() {
  let env = TestEnv::with_app_output();

  env
    .sync_cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("Committed snapshot"))
    .stdout(predicate::str::contains("generation 1"));

  let status = env.status_json();
  assert_eq!(status["generation"], 1);
  assert_eq!(status["target_count"], 3);
  assert_eq!(status["library_count"], 1);
  assert_eq!(status["stale"], false);
}

#[test]
fn test_sync_json_output() {
  let env = TestEnv::with_app_output();

  let result = env.sync_json();
  assert_eq!(result["generation"], 1);
  assert_eq!(result["changed"], true);
  assert_eq!(result["target_count"], 3);
  assert_eq!(result["android_source_packages"], 2);
  assert_eq!(result["digest"].as_str().unwrap().len(), 64);
}

#[test]
fn test_repeated_sync_is_idempotent() {
  let env = TestEnv::with_app_output();

  let first = env.sync_json();
  let second = env.sync_json();

  assert_eq!(second["generation"], 2);
  assert_eq!(second["changed"], false);
  assert_eq!(first["digest"], second["digest"]);
  assert_ne!(first["snapshot_id"], second["snapshot_id"]);
}

#[test]
fn test_sync_picks_up_new_output() {
  let env = TestEnv::with_app_output();
  let first = env.sync_json();

  env.write_output(
    "extra.qsync.json",
    r#"{"label": "//extra:extra", "java": {"android_resources_package": "com.example.extra"}}"#,
  );
  let second = env.sync_json();

  assert_eq!(second["changed"], true);
  assert_eq!(second["target_count"], 4);
  assert_eq!(second["android_source_packages"], 3);
  assert_ne!(first["digest"], second["digest"]);
}

#[test]
fn test_malformed_output_aborts_and_marks_stale() {
  let env = TestEnv::with_app_output();
  let committed = env.sync_json();

  env.write_output("broken.qsync.json", "{ not json");
  env
    .sync_cmd()
    .assert()
    .failure()
    .stderr(predicate::str::contains("failed to collect built targets"))
    .stderr(predicate::str::contains("broken.qsync.json"));

  let status = env.status_json();
  assert_eq!(status["snapshot_id"], committed["snapshot_id"]);
  assert_eq!(status["generation"], 1);
  assert_eq!(status["stale"], true);

  env
    .qsync_cmd()
    .arg("status")
    .assert()
    .success()
    .stderr(predicate::str::contains("last sync failed"));
}

#[test]
fn test_successful_sync_clears_stale() {
  let env = TestEnv::with_app_output();
  env.sync_json();

  let broken = env.write_output("broken.qsync.json", "{ not json");
  env.sync_cmd().assert().failure();
  assert_eq!(env.status_json()["stale"], true);

  std::fs::remove_file(broken).unwrap();
  let result = env.sync_json();
  assert_eq!(result["generation"], 2);
  assert_eq!(env.status_json()["stale"], false);
}

#[test]
fn test_skip_policy_ignores_malformed_output() {
  let env = TestEnv::with_app_output();
  env.write_output("broken.qsync.json", "{ not json");

  let output = env
    .sync_cmd()
    .args(["--on-malformed", "skip", "-o", "json"])
    .output()
    .unwrap();
  assert!(
    output.status.success(),
    "sync failed: {}",
    String::from_utf8_lossy(&output.stderr)
  );

  let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(result["target_count"], 3);
}

#[test]
fn test_skip_policy_from_config() {
  let env = TestEnv::with_app_output();
  env.write_output("broken.qsync.json", "{ not json");
  let config = format!(
    "aspect_output_dir = {:?}\non_malformed = \"skip\"\n",
    env.output_path().display().to_string()
  );
  env.write_file("config/config.toml", &config);

  env.qsync_cmd().arg("sync").assert().success();
  assert_eq!(env.status_json()["target_count"], 3);
}

#[test]
fn test_sync_builds_on_base_project() {
  let env = TestEnv::with_app_output();
  let base = env.write_file(
    "base.json",
    r#"{"workspace_module": {"name": ".workspace", "android_source_packages": ["com.example.base"]}}"#,
  );

  let output = env
    .sync_cmd()
    .arg("--base")
    .arg(&base)
    .args(["-o", "json"])
    .output()
    .unwrap();
  assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

  let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(result["android_source_packages"], 3);
}

#[test]
fn test_missing_output_dir_fails() {
  let env = TestEnv::new();

  env
    .qsync_cmd()
    .args(["sync", "--aspect-output"])
    .arg(env.temp.path().join("missing"))
    .assert()
    .failure();

  assert_eq!(env.status_json()["snapshot_id"], serde_json::Value::Null);
}

#[test]
fn test_app_output_is_valid_json() {
  let parsed: serde_json::Value = serde_json::from_str(APP_OUTPUT).unwrap();
  assert_eq!(parsed.as_array().unwrap().len(), 3);
}
