//! Staging accumulator for one update pass.
//!
//! Every collection exposed here is additive and set-like: values keep their
//! first-occurrence order, duplicates are dropped, and blank strings or empty
//! paths are never stored. There are no removal methods, so one operation can
//! never undo another's contributions.

use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use super::{CcWorkspace, Library, Module, Project};

fn insert_string(set: &mut IndexSet<String>, value: String) -> bool {
  if value.trim().is_empty() {
    trace!("ignoring blank entry");
    return false;
  }
  set.insert(value)
}

fn insert_path(set: &mut IndexSet<PathBuf>, value: PathBuf) -> bool {
  if value.as_os_str().is_empty() {
    trace!("ignoring empty path");
    return false;
  }
  set.insert(value)
}

/// Builder for the workspace module.
#[derive(Debug, Clone)]
pub struct ModuleBuilder {
  name: String,
  android_source_packages: IndexSet<String>,
  generated_source_roots: IndexSet<PathBuf>,
  generated_source_jars: IndexSet<PathBuf>,
  android_library_aars: IndexSet<PathBuf>,
}

impl ModuleBuilder {
  fn from_module(module: &Module) -> Self {
    let mut builder = Self {
      name: module.name.clone(),
      android_source_packages: IndexSet::new(),
      generated_source_roots: IndexSet::new(),
      generated_source_jars: IndexSet::new(),
      android_library_aars: IndexSet::new(),
    };
    builder.add_all_android_source_packages(module.android_source_packages.iter().cloned());
    for root in &module.generated_source_roots {
      builder.add_generated_source_root(root.clone());
    }
    for jar in &module.generated_source_jars {
      builder.add_generated_source_jar(jar.clone());
    }
    for aar in &module.android_library_aars {
      builder.add_android_library_aar(aar.clone());
    }
    builder
  }

  pub fn add_android_source_package(&mut self, package: impl Into<String>) -> &mut Self {
    insert_string(&mut self.android_source_packages, package.into());
    self
  }

  pub fn add_all_android_source_packages<I, S>(&mut self, packages: I) -> &mut Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    for package in packages {
      insert_string(&mut self.android_source_packages, package.into());
    }
    self
  }

  pub fn android_source_packages(&self) -> impl Iterator<Item = &str> {
    self.android_source_packages.iter().map(String::as_str)
  }

  pub fn add_generated_source_root(&mut self, root: impl Into<PathBuf>) -> &mut Self {
    insert_path(&mut self.generated_source_roots, root.into());
    self
  }

  pub fn add_generated_source_jar(&mut self, jar: impl Into<PathBuf>) -> &mut Self {
    insert_path(&mut self.generated_source_jars, jar.into());
    self
  }

  pub fn has_generated_source_jar(&self, jar: &Path) -> bool {
    self.generated_source_jars.contains(jar)
  }

  pub fn add_android_library_aar(&mut self, aar: impl Into<PathBuf>) -> &mut Self {
    insert_path(&mut self.android_library_aars, aar.into());
    self
  }

  fn build(self) -> Module {
    Module {
      name: self.name,
      android_source_packages: self.android_source_packages.into_iter().collect(),
      generated_source_roots: self.generated_source_roots.into_iter().collect(),
      generated_source_jars: self.generated_source_jars.into_iter().collect(),
      android_library_aars: self.android_library_aars.into_iter().collect(),
    }
  }
}

/// Builder for one library.
#[derive(Debug, Clone)]
pub struct LibraryBuilder {
  name: String,
  class_jars: IndexSet<PathBuf>,
  source_jars: IndexSet<PathBuf>,
}

impl LibraryBuilder {
  fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      class_jars: IndexSet::new(),
      source_jars: IndexSet::new(),
    }
  }

  /// Add the jars of `library` to this builder.
  fn merge(&mut self, library: &Library) {
    for jar in &library.class_jars {
      self.add_class_jar(jar.clone());
    }
    for jar in &library.source_jars {
      self.add_source_jar(jar.clone());
    }
  }

  pub fn add_class_jar(&mut self, jar: impl Into<PathBuf>) -> &mut Self {
    insert_path(&mut self.class_jars, jar.into());
    self
  }

  pub fn add_source_jar(&mut self, jar: impl Into<PathBuf>) -> &mut Self {
    insert_path(&mut self.source_jars, jar.into());
    self
  }

  fn build(self) -> Library {
    Library {
      name: self.name,
      class_jars: self.class_jars.into_iter().collect(),
      source_jars: self.source_jars.into_iter().collect(),
    }
  }
}

/// Builder for the shared C/C++ settings.
#[derive(Debug, Clone, Default)]
pub struct CcWorkspaceBuilder {
  include_directories: IndexSet<PathBuf>,
  defines: IndexSet<String>,
}

impl CcWorkspaceBuilder {
  fn from_workspace(workspace: &CcWorkspace) -> Self {
    let mut builder = Self::default();
    for dir in &workspace.include_directories {
      builder.add_include_directory(dir.clone());
    }
    for define in &workspace.defines {
      builder.add_define(define.clone());
    }
    builder
  }

  pub fn add_include_directory(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
    insert_path(&mut self.include_directories, dir.into());
    self
  }

  pub fn add_define(&mut self, define: impl Into<String>) -> &mut Self {
    insert_string(&mut self.defines, define.into());
    self
  }

  fn build(self) -> CcWorkspace {
    CcWorkspace {
      include_directories: self.include_directories.into_iter().collect(),
      defines: self.defines.into_iter().collect(),
    }
  }
}

/// Mutable staging area for one update pass.
///
/// Created from the base project at the start of a pass, mutated by each
/// update operation in turn, and consumed by [`build`](Self::build) once at
/// the end. Not shared between threads.
#[derive(Debug, Clone)]
pub struct ProjectProtoUpdate {
  workspace_module: ModuleBuilder,
  libraries: IndexMap<String, LibraryBuilder>,
  cc_workspace: Option<CcWorkspaceBuilder>,
}

impl ProjectProtoUpdate {
  /// Stage additions on top of `base`. Entries already in `base` count as present.
  ///
  /// `base` goes through the same set rules as later additions: blanks are
  /// dropped and libraries sharing a name are merged in order.
  pub fn new(base: &Project) -> Self {
    let mut update = Self {
      workspace_module: ModuleBuilder::from_module(&base.workspace_module),
      libraries: IndexMap::new(),
      cc_workspace: base.cc_workspace.as_ref().map(CcWorkspaceBuilder::from_workspace),
    };
    for library in &base.libraries {
      update.library(&library.name).merge(library);
    }
    update
  }

  pub fn workspace_module(&mut self) -> &mut ModuleBuilder {
    &mut self.workspace_module
  }

  /// The library named `name`, created empty on first access.
  pub fn library(&mut self, name: &str) -> &mut LibraryBuilder {
    self
      .libraries
      .entry(name.to_string())
      .or_insert_with(|| LibraryBuilder::new(name))
  }

  /// The C/C++ settings, created empty on first access.
  pub fn cc_workspace(&mut self) -> &mut CcWorkspaceBuilder {
    self.cc_workspace.get_or_insert_with(CcWorkspaceBuilder::default)
  }

  /// Produce the updated project. Consumes the update.
  pub fn build(self) -> Project {
    Project {
      workspace_module: self.workspace_module.build(),
      libraries: self.libraries.into_values().map(LibraryBuilder::build).collect(),
      cc_workspace: self.cc_workspace.map(CcWorkspaceBuilder::build),
    }
  }
}
