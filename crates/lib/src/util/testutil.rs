//! Test utilities for qsync-lib.
//!
//! Builders for target fixtures and helpers for laying out aspect output and
//! executable scripts in temporary directories.

use std::fs;
use std::path::{Path, PathBuf};

use crate::artifact::{CcCompilationInfo, JavaArtifactInfo, Label, TargetBuildInfo};

/// A target with neither java nor cc info.
pub fn target(label: &str) -> TargetBuildInfo {
  TargetBuildInfo::new(Label::parse(label).unwrap())
}

/// A target with java info shaped by `configure`.
pub fn java_target(label: &str, configure: impl FnOnce(&mut JavaArtifactInfo)) -> TargetBuildInfo {
  let mut info = JavaArtifactInfo::default();
  configure(&mut info);
  target(label).with_java(info)
}

/// A target with cc info shaped by `configure`.
pub fn cc_target(label: &str, configure: impl FnOnce(&mut CcCompilationInfo)) -> TargetBuildInfo {
  let mut info = CcCompilationInfo::default();
  configure(&mut info);
  target(label).with_cc(info)
}

/// A target whose only fact is an Android resources package.
pub fn res_target(label: &str, package: &str) -> TargetBuildInfo {
  java_target(label, |java| java.android_resources_package = Some(package.to_string()))
}

/// Write `content` to `dir/rel`, creating parent directories.
pub fn write_aspect_file(dir: &Path, rel: &str, content: &str) -> PathBuf {
  let path = dir.join(rel);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(&path, content).unwrap();
  path
}

/// Write an executable `/bin/sh` script to `dir/name`.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let path = dir.join(name);
  fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
  fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
  path
}
