//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Aspect output for a small Android app with one C++ dependency.
pub const APP_OUTPUT: &str = r#"[
  {
    "label": "//app:app",
    "java": {
      "jars": ["bazel-out/app/libapp.jar"],
      "src_jars": ["bazel-out/app/libapp-src.jar"],
      "gen_srcs": ["bazel-out/app/gen/R.java", "bazel-out/app/app.srcjar"],
      "android_resources_package": "com.example.app"
    }
  },
  {
    "label": "//lib:util",
    "java": {
      "jars": ["bazel-out/lib/libutil.jar"],
      "ide_aars": ["bazel-out/lib/util.aar"],
      "android_resources_package": "com.example.util"
    }
  },
  {
    "label": "//native:jni",
    "cc": {
      "include_directories": ["native/include"],
      "defines": ["NDEBUG"]
    }
  }
]"#;

/// Isolated test environment.
///
/// Each test gets its own temporary directory with isolated data, config, and
/// aspect output paths.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// Create an environment whose aspect output holds [`APP_OUTPUT`].
  pub fn with_app_output() -> Self {
    let env = Self::new();
    env.write_output("app.qsync.json", APP_OUTPUT);
    env
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  /// Write a file into the aspect output directory.
  pub fn write_output(&self, name: &str, content: &str) -> PathBuf {
    self.write_file(&format!("aspect-out/{}", name), content)
  }

  fn dir(&self, name: &str) -> PathBuf {
    let p = self.temp.path().join(name);
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Aspect output directory.
  pub fn output_path(&self) -> PathBuf {
    self.dir("aspect-out")
  }

  /// Data path for snapshots and the store lock.
  pub fn data_path(&self) -> PathBuf {
    self.dir("data")
  }

  pub fn config_path(&self) -> PathBuf {
    self.dir("config")
  }

  /// Get a pre-configured Command for the qsync binary.
  ///
  /// Points `QSYNC_DATA_DIR` and `QSYNC_CONFIG_DIR` at isolated directories.
  pub fn qsync_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("qsync");
    cmd.env("QSYNC_DATA_DIR", self.data_path());
    cmd.env("QSYNC_CONFIG_DIR", self.config_path());
    cmd.env_remove("RUST_LOG");
    cmd
  }

  /// `qsync sync` against the environment's aspect output.
  pub fn sync_cmd(&self) -> Command {
    let mut cmd = self.qsync_cmd();
    cmd.arg("sync").arg("--aspect-output").arg(self.output_path());
    cmd
  }

  /// Run `qsync sync -o json` and return the parsed output.
  pub fn sync_json(&self) -> serde_json::Value {
    let output = self.sync_cmd().args(["-o", "json"]).output().unwrap();
    assert!(
      output.status.success(),
      "sync failed: {}",
      String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
  }

  /// Run `qsync status -o json` and return the parsed output.
  pub fn status_json(&self) -> serde_json::Value {
    let output = self.qsync_cmd().args(["status", "-o", "json"]).output().unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
  }
}
