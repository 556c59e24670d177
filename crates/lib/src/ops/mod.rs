//! Update operations.
//!
//! Each operation reads the built targets from its injected supplier and
//! stages exactly one kind of fact into a [`ProjectProtoUpdate`]. Operations
//! are independent of each other except where an operation documents an
//! ordering requirement (see [`AddDependencySrcJars`]).
//!
//! [`default_operations`] returns the built-in operations in the order the
//! orchestrator should run them. New facts are added by writing a new
//! operation and registering it; existing operations stay untouched.

mod android_res;
mod cc;
mod gen_srcs;
mod jars;

use crate::artifact::{JavaArtifactInfo, TargetBuildInfo};
use crate::deps::{BuildError, MalformedPolicy, SharedSupplier};
use crate::project::ProjectProtoUpdate;

pub use android_res::AddAndroidResPackages;
pub use cc::AddCcIncludeDirectories;
pub use gen_srcs::AddProjectGenSrcs;
pub use jars::{AddDependencyAars, AddDependencyJars, AddDependencySrcJars};

/// One unit of the update pipeline.
///
/// Implementations must only add to `update` and must not keep any reference
/// to it after `update` returns.
pub trait ProjectProtoUpdateOperation: Send + Sync {
  /// Short name used in logs and errors.
  fn name(&self) -> &str;

  /// How this operation treats malformed per-target metadata.
  fn malformed_policy(&self) -> MalformedPolicy {
    MalformedPolicy::Abort
  }

  fn update(&self, update: &mut ProjectProtoUpdate) -> Result<(), BuildError>;
}

/// The built-in operations, in registration order.
pub fn default_operations(
  supplier: SharedSupplier,
  policy: MalformedPolicy,
) -> Vec<Box<dyn ProjectProtoUpdateOperation>> {
  vec![
    Box::new(AddAndroidResPackages::new(supplier.clone())),
    Box::new(AddProjectGenSrcs::new(supplier.clone()).with_policy(policy)),
    Box::new(AddDependencyJars::new(supplier.clone()).with_policy(policy)),
    Box::new(AddDependencySrcJars::new(supplier.clone()).with_policy(policy)),
    Box::new(AddDependencyAars::new(supplier.clone()).with_policy(policy)),
    Box::new(AddCcIncludeDirectories::new(supplier)),
  ]
}

/// Targets that carry Java info, paired with that info.
fn java_infos(targets: &[TargetBuildInfo]) -> impl Iterator<Item = (&TargetBuildInfo, &JavaArtifactInfo)> {
  targets
    .iter()
    .filter_map(|target| target.java_info().map(|info| (target, info)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::deps::StaticSupplier;

  #[test]
  fn default_operations_are_ordered() {
    let ops = default_operations(StaticSupplier::shared(Vec::new()), MalformedPolicy::Abort);
    let names: Vec<_> = ops.iter().map(|op| op.name()).collect();

    assert_eq!(
      names,
      vec![
        "add_android_res_packages",
        "add_project_gen_srcs",
        "add_dependency_jars",
        "add_dependency_src_jars",
        "add_dependency_aars",
        "add_cc_include_directories",
      ]
    );

    let gen_srcs = names.iter().position(|n| *n == "add_project_gen_srcs").unwrap();
    let src_jars = names.iter().position(|n| *n == "add_dependency_src_jars").unwrap();
    assert!(gen_srcs < src_jars);
  }

  #[test]
  fn default_operations_carry_policy() {
    let ops = default_operations(StaticSupplier::shared(Vec::new()), MalformedPolicy::Skip);

    let policy_of = |name: &str| ops.iter().find(|op| op.name() == name).unwrap().malformed_policy();
    assert_eq!(policy_of("add_dependency_jars"), MalformedPolicy::Skip);
    assert_eq!(policy_of("add_android_res_packages"), MalformedPolicy::Abort);
  }
}
