use indexmap::IndexSet;

use crate::deps::{BuildError, SharedSupplier};
use crate::project::ProjectProtoUpdate;

use super::{ProjectProtoUpdateOperation, java_infos};

/// Adds the Android resource packages extracted by the aspect to the
/// workspace module's source packages.
///
/// Absent and blank packages are dropped; duplicates collapse to their first
/// occurrence in supplier order.
pub struct AddAndroidResPackages {
  supplier: SharedSupplier,
}

impl AddAndroidResPackages {
  pub fn new(supplier: SharedSupplier) -> Self {
    Self { supplier }
  }
}

impl ProjectProtoUpdateOperation for AddAndroidResPackages {
  fn name(&self) -> &str {
    "add_android_res_packages"
  }

  fn update(&self, update: &mut ProjectProtoUpdate) -> Result<(), BuildError> {
    let targets = self.supplier.get()?;

    let packages: IndexSet<&str> = java_infos(&targets)
      .filter_map(|(_, info)| info.android_resources_package())
      .collect();

    update.workspace_module().add_all_android_source_packages(packages);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::artifact::TargetBuildInfo;
  use crate::deps::StaticSupplier;
  use crate::project::Project;
  use crate::util::testutil::{java_target, res_target, target};

  fn run(targets: Vec<TargetBuildInfo>) -> Vec<String> {
    let op = AddAndroidResPackages::new(StaticSupplier::shared(targets));
    let mut update = ProjectProtoUpdate::new(&Project::default());
    op.update(&mut update).unwrap();
    update.build().workspace_module.android_source_packages
  }

  #[test]
  fn duplicate_package_and_missing_java_info() {
    let packages = run(vec![
      res_target("//t1:t1", "com.app"),
      target("//t2:t2"),
      res_target("//t3:t3", "com.app"),
    ]);

    assert_eq!(packages, vec!["com.app"]);
  }

  #[test]
  fn distinct_values_in_first_occurrence_order() {
    let packages = run(vec![
      res_target("//a:a", "com.b"),
      res_target("//b:b", "com.a"),
      res_target("//c:c", "com.b"),
      res_target("//d:d", "com.c"),
      res_target("//e:e", "com.a"),
    ]);

    assert_eq!(packages, vec!["com.b", "com.a", "com.c"]);
  }

  #[test]
  fn blank_and_absent_packages_are_dropped() {
    let packages = run(vec![
      res_target("//a:a", ""),
      res_target("//b:b", "   "),
      java_target("//c:c", |_| {}),
      res_target("//d:d", "com.d"),
    ]);

    assert_eq!(packages, vec!["com.d"]);
  }

  #[test]
  fn packages_are_kept_as_reported() {
    let packages = run(vec![res_target("//a:a", " com.a "), res_target("//b:b", "com.a")]);

    assert_eq!(packages, vec![" com.a ", "com.a"]);
  }

  #[test]
  fn empty_supplier_contributes_nothing() {
    assert!(run(Vec::new()).is_empty());
  }

  #[test]
  fn target_without_java_info_contributes_nothing() {
    assert!(run(vec![target("//native:lib")]).is_empty());
  }
}
