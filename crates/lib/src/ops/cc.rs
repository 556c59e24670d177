use crate::deps::{BuildError, SharedSupplier};
use crate::project::ProjectProtoUpdate;

use super::ProjectProtoUpdateOperation;

/// Adds C/C++ include directories and defines to the shared cc workspace.
///
/// The cc workspace is only created when at least one target has cc info.
pub struct AddCcIncludeDirectories {
  supplier: SharedSupplier,
}

impl AddCcIncludeDirectories {
  pub fn new(supplier: SharedSupplier) -> Self {
    Self { supplier }
  }
}

impl ProjectProtoUpdateOperation for AddCcIncludeDirectories {
  fn name(&self) -> &str {
    "add_cc_include_directories"
  }

  fn update(&self, update: &mut ProjectProtoUpdate) -> Result<(), BuildError> {
    let targets = self.supplier.get()?;

    for info in targets.iter().filter_map(|target| target.cc_info()) {
      let cc = update.cc_workspace();
      for dir in info.all_include_directories() {
        cc.add_include_directory(dir);
      }
      for define in &info.defines {
        cc.add_define(define);
      }
    }

    Ok(())
  }
}
