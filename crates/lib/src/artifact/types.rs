use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::Label;

/// Java/Android facts the aspect extracted for one target.
///
/// Paths are as reported by the aspect, relative to the execution root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JavaArtifactInfo {
  /// Compiled class jars.
  pub jars: Vec<PathBuf>,
  /// Android archives consumed by IDE resource handling.
  pub ide_aars: Vec<PathBuf>,
  /// Generated sources (`.java`, `.kt`) and generated source jars (`.srcjar`).
  pub gen_srcs: Vec<PathBuf>,
  /// Source jars attached to the compiled jars.
  pub src_jars: Vec<PathBuf>,
  /// Checked-in sources of the target.
  pub sources: Vec<PathBuf>,
  /// Java package of the target's Android resources. May be absent or blank.
  pub android_resources_package: Option<String>,
  /// Direct dependencies.
  pub deps: Vec<Label>,
}

impl JavaArtifactInfo {
  /// The Android resources package as reported, unless absent or blank.
  pub fn android_resources_package(&self) -> Option<&str> {
    self
      .android_resources_package
      .as_deref()
      .filter(|pkg| !pkg.trim().is_empty())
  }
}

/// C/C++ compilation facts the aspect extracted for one target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CcCompilationInfo {
  pub include_directories: Vec<PathBuf>,
  pub quote_include_directories: Vec<PathBuf>,
  pub system_include_directories: Vec<PathBuf>,
  pub gen_headers: Vec<PathBuf>,
  pub defines: Vec<String>,
}

impl CcCompilationInfo {
  /// All include directories, regular first, then quote, then system.
  pub fn all_include_directories(&self) -> impl Iterator<Item = &PathBuf> {
    self
      .include_directories
      .iter()
      .chain(&self.quote_include_directories)
      .chain(&self.system_include_directories)
  }
}

/// One built target and the per-language facts produced for it.
///
/// Constructed once when a build result is ingested and shared read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetBuildInfo {
  pub label: Label,
  #[serde(rename = "java", default, skip_serializing_if = "Option::is_none")]
  pub java_info: Option<JavaArtifactInfo>,
  #[serde(rename = "cc", default, skip_serializing_if = "Option::is_none")]
  pub cc_info: Option<CcCompilationInfo>,
}

impl TargetBuildInfo {
  pub fn new(label: Label) -> Self {
    Self {
      label,
      java_info: None,
      cc_info: None,
    }
  }

  pub fn with_java(mut self, info: JavaArtifactInfo) -> Self {
    self.java_info = Some(info);
    self
  }

  pub fn with_cc(mut self, info: CcCompilationInfo) -> Self {
    self.cc_info = Some(info);
    self
  }

  pub fn java_info(&self) -> Option<&JavaArtifactInfo> {
    self.java_info.as_ref()
  }

  pub fn cc_info(&self) -> Option<&CcCompilationInfo> {
    self.cc_info.as_ref()
  }
}
