use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::consts::WORKSPACE_MODULE_NAME;

#[derive(Debug, Error)]
pub enum ProjectError {
  #[error("failed to read project file {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse project file {}: {source}", .path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// A module of the project. Every project has exactly one workspace module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
  pub name: String,
  /// Java packages of Android resources reachable from the workspace.
  #[serde(default)]
  pub android_source_packages: Vec<String>,
  /// Directories holding generated sources.
  #[serde(default)]
  pub generated_source_roots: Vec<PathBuf>,
  /// Jars of generated sources.
  #[serde(default)]
  pub generated_source_jars: Vec<PathBuf>,
  /// Android archives the module's resources depend on.
  #[serde(default)]
  pub android_library_aars: Vec<PathBuf>,
}

impl Module {
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      ..Default::default()
    }
  }
}

/// An external library the project depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
  pub name: String,
  #[serde(default)]
  pub class_jars: Vec<PathBuf>,
  #[serde(default)]
  pub source_jars: Vec<PathBuf>,
}

/// C/C++ compilation settings shared by the workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CcWorkspace {
  #[serde(default)]
  pub include_directories: Vec<PathBuf>,
  #[serde(default)]
  pub defines: Vec<String>,
}

/// The project model consumed by indexing and navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
  pub workspace_module: Module,
  #[serde(default)]
  pub libraries: Vec<Library>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cc_workspace: Option<CcWorkspace>,
}

impl Default for Project {
  fn default() -> Self {
    Self {
      workspace_module: Module::new(WORKSPACE_MODULE_NAME),
      libraries: Vec::new(),
      cc_workspace: None,
    }
  }
}

impl Project {
  /// Load a project from a JSON file.
  pub fn load(path: &Path) -> Result<Self, ProjectError> {
    let content = fs::read_to_string(path).map_err(|source| ProjectError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|source| ProjectError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  pub fn library(&self, name: &str) -> Option<&Library> {
    self.libraries.iter().find(|lib| lib.name == name)
  }

  /// SHA-256 of the canonical JSON serialization, as lowercase hex.
  ///
  /// Two projects with the same digest serialize to identical bytes.
  pub fn digest(&self) -> Result<String, serde_json::Error> {
    let serialized = serde_json::to_vec(self)?;
    let mut hasher = Sha256::new();
    hasher.update(&serialized);
    Ok(hex::encode(hasher.finalize()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn default_project_has_workspace_module() {
    let project = Project::default();
    assert_eq!(project.workspace_module.name, WORKSPACE_MODULE_NAME);
    assert!(project.libraries.is_empty());
    assert!(project.cc_workspace.is_none());
  }

  #[test]
  fn digest_is_deterministic() {
    let mut project = Project::default();
    project.workspace_module.android_source_packages.push("com.app".to_string());

    assert_eq!(project.digest().unwrap(), project.clone().digest().unwrap());
    assert_eq!(project.digest().unwrap().len(), 64);
  }

  #[test]
  fn digest_changes_with_content() {
    let empty = Project::default();
    let mut other = Project::default();
    other.workspace_module.android_source_packages.push("com.app".to_string());

    assert_ne!(empty.digest().unwrap(), other.digest().unwrap());
  }

  #[test]
  fn load_minimal_project_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("project.json");
    fs::write(&path, r#"{"workspace_module": {"name": ".workspace"}}"#).unwrap();

    let project = Project::load(&path).unwrap();
    assert_eq!(project, Project::default());
  }

  #[test]
  fn load_reports_parse_errors_with_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("project.json");
    fs::write(&path, "[]").unwrap();

    let err = Project::load(&path).unwrap_err();
    assert!(matches!(err, ProjectError::Parse { .. }));
    assert!(err.to_string().contains("project.json"));
  }
}
