//! Dependency jar operations.
//!
//! All three operations contribute to the workspace's dependency view:
//! class jars and source jars go to the shared dependencies library, Android
//! archives to the workspace module.

use std::path::Path;

use tracing::trace;

use crate::consts::DEPENDENCIES_LIBRARY;
use crate::deps::{BuildError, MalformedPolicy, SharedSupplier};
use crate::project::ProjectProtoUpdate;

use super::{ProjectProtoUpdateOperation, java_infos};

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .is_some_and(|ext| extensions.contains(&ext))
}

/// Adds compiled dependency jars as class jars of the dependencies library.
pub struct AddDependencyJars {
  supplier: SharedSupplier,
  policy: MalformedPolicy,
}

impl AddDependencyJars {
  pub fn new(supplier: SharedSupplier) -> Self {
    Self {
      supplier,
      policy: MalformedPolicy::default(),
    }
  }

  pub fn with_policy(mut self, policy: MalformedPolicy) -> Self {
    self.policy = policy;
    self
  }
}

impl ProjectProtoUpdateOperation for AddDependencyJars {
  fn name(&self) -> &str {
    "add_dependency_jars"
  }

  fn malformed_policy(&self) -> MalformedPolicy {
    self.policy
  }

  fn update(&self, update: &mut ProjectProtoUpdate) -> Result<(), BuildError> {
    let targets = self.supplier.get()?;

    for (target, info) in java_infos(&targets) {
      for jar in &info.jars {
        if !has_extension(jar, &["jar"]) {
          self
            .policy
            .handle(BuildError::malformed(&target.label, format!("{:?} is not a jar", jar)))?;
          continue;
        }
        update.library(DEPENDENCIES_LIBRARY).add_class_jar(jar);
      }
    }

    Ok(())
  }
}

/// Adds source jars as source attachments of the dependencies library.
///
/// Jars already registered as generated source jars of the workspace module
/// are left out, so this operation must run after [`super::AddProjectGenSrcs`].
pub struct AddDependencySrcJars {
  supplier: SharedSupplier,
  policy: MalformedPolicy,
}

impl AddDependencySrcJars {
  pub fn new(supplier: SharedSupplier) -> Self {
    Self {
      supplier,
      policy: MalformedPolicy::default(),
    }
  }

  pub fn with_policy(mut self, policy: MalformedPolicy) -> Self {
    self.policy = policy;
    self
  }
}

impl ProjectProtoUpdateOperation for AddDependencySrcJars {
  fn name(&self) -> &str {
    "add_dependency_src_jars"
  }

  fn malformed_policy(&self) -> MalformedPolicy {
    self.policy
  }

  fn update(&self, update: &mut ProjectProtoUpdate) -> Result<(), BuildError> {
    let targets = self.supplier.get()?;

    for (target, info) in java_infos(&targets) {
      for jar in &info.src_jars {
        if !has_extension(jar, &["jar", "srcjar"]) {
          self
            .policy
            .handle(BuildError::malformed(&target.label, format!("{:?} is not a source jar", jar)))?;
          continue;
        }
        if update.workspace_module().has_generated_source_jar(jar) {
          trace!(label = %target.label, jar = %jar.display(), "source jar is generated, not a dependency");
          continue;
        }
        update.library(DEPENDENCIES_LIBRARY).add_source_jar(jar);
      }
    }

    Ok(())
  }
}

/// Adds Android archives to the workspace module.
pub struct AddDependencyAars {
  supplier: SharedSupplier,
  policy: MalformedPolicy,
}

impl AddDependencyAars {
  pub fn new(supplier: SharedSupplier) -> Self {
    Self {
      supplier,
      policy: MalformedPolicy::default(),
    }
  }

  pub fn with_policy(mut self, policy: MalformedPolicy) -> Self {
    self.policy = policy;
    self
  }
}

impl ProjectProtoUpdateOperation for AddDependencyAars {
  fn name(&self) -> &str {
    "add_dependency_aars"
  }

  fn malformed_policy(&self) -> MalformedPolicy {
    self.policy
  }

  fn update(&self, update: &mut ProjectProtoUpdate) -> Result<(), BuildError> {
    let targets = self.supplier.get()?;

    for (target, info) in java_infos(&targets) {
      for aar in &info.ide_aars {
        if !has_extension(aar, &["aar"]) {
          self
            .policy
            .handle(BuildError::malformed(&target.label, format!("{:?} is not an aar", aar)))?;
          continue;
        }
        update.workspace_module().add_android_library_aar(aar);
      }
    }

    Ok(())
  }
}
