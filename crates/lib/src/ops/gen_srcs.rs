use std::path::{Path, PathBuf};

use tracing::trace;

use crate::deps::{BuildError, MalformedPolicy, SharedSupplier};
use crate::project::ProjectProtoUpdate;

use super::{ProjectProtoUpdateOperation, java_infos};

/// Registers generated sources with the workspace module.
///
/// Generated `.srcjar` files become generated source jars; generated `.java`
/// and `.kt` files contribute their directory as a generated source root.
/// Other files are ignored. Paths must be relative to the execution root.
pub struct AddProjectGenSrcs {
  supplier: SharedSupplier,
  policy: MalformedPolicy,
}

impl AddProjectGenSrcs {
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

enum GenSrc<'a> {
  SourceJar(&'a Path),
  SourceRoot(PathBuf),
  Other,
}

fn classify(path: &Path) -> GenSrc<'_> {
  match path.extension().and_then(|ext| ext.to_str()) {
    Some("srcjar") => GenSrc::SourceJar(path),
    Some("java" | "kt") => {
      let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
      GenSrc::SourceRoot(parent.map_or_else(|| PathBuf::from("."), Path::to_path_buf))
    }
    _ => GenSrc::Other,
  }
}

impl ProjectProtoUpdateOperation for AddProjectGenSrcs {
  fn name(&self) -> &str {
    "add_project_gen_srcs"
  }

  fn malformed_policy(&self) -> MalformedPolicy {
    self.policy
  }

  fn update(&self, update: &mut ProjectProtoUpdate) -> Result<(), BuildError> {
    let targets = self.supplier.get()?;

    for (target, info) in java_infos(&targets) {
      for path in &info.gen_srcs {
        if path.as_os_str().is_empty() || path.is_absolute() {
          self.policy.handle(BuildError::malformed(
            &target.label,
            format!("generated source path {:?} must be relative", path),
          ))?;
          continue;
        }

        match classify(path) {
          GenSrc::SourceJar(jar) => {
            update.workspace_module().add_generated_source_jar(jar);
          }
          GenSrc::SourceRoot(root) => {
            update.workspace_module().add_generated_source_root(root);
          }
          GenSrc::Other => trace!(label = %target.label, path = %path.display(), "ignoring generated file"),
        }
      }
    }

    Ok(())
  }
}
