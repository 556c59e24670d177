//! Built-dependency suppliers.
//!
//! A supplier answers "which targets have been built, and what did they
//! produce", independently of how or when the build ran. Update operations
//! query it during a pass; the orchestrator calls
//! [`BuiltDependenciesSupplier::invalidate`] when the pass ends so that
//! memoized results never leak into the next pass.
//!
//! # Submodules
//!
//! - [`aspect_supplier`] - Supplier backed by aspect output files on disk

pub mod aspect_supplier;
mod types;

use std::sync::Arc;

use crate::artifact::TargetBuildInfo;

pub use aspect_supplier::AspectOutputSupplier;
pub use types::{BuildError, MalformedPolicy};

/// Source of the targets known to be built.
pub trait BuiltDependenciesSupplier: Send + Sync {
  /// Return the current set of built targets.
  ///
  /// May be called any number of times during a pass; implementations that
  /// do expensive work should memoize until [`invalidate`](Self::invalidate).
  fn get(&self) -> Result<Arc<[TargetBuildInfo]>, BuildError>;

  /// Drop any memoized result. Called by the orchestrator at the end of every pass.
  fn invalidate(&self) {}
}

/// Shared handle to a supplier, as injected into update operations.
pub type SharedSupplier = Arc<dyn BuiltDependenciesSupplier>;

impl<T: BuiltDependenciesSupplier + ?Sized> BuiltDependenciesSupplier for Arc<T> {
  fn get(&self) -> Result<Arc<[TargetBuildInfo]>, BuildError> {
    (**self).get()
  }

  fn invalidate(&self) {
    (**self).invalidate()
  }
}

/// Supplier over a fixed, in-memory list of targets.
#[derive(Debug, Clone, Default)]
pub struct StaticSupplier {
  targets: Arc<[TargetBuildInfo]>,
}

impl StaticSupplier {
  pub fn new(targets: Vec<TargetBuildInfo>) -> Self {
    Self {
      targets: targets.into(),
    }
  }

  pub fn shared(targets: Vec<TargetBuildInfo>) -> SharedSupplier {
    Arc::new(Self::new(targets))
  }
}

impl BuiltDependenciesSupplier for StaticSupplier {
  fn get(&self) -> Result<Arc<[TargetBuildInfo]>, BuildError> {
    Ok(self.targets.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::artifact::Label;

  #[test]
  fn static_supplier_returns_same_targets_every_call() {
    let supplier = StaticSupplier::new(vec![TargetBuildInfo::new(Label::parse("//a:a").unwrap())]);

    let first = supplier.get().unwrap();
    let second = supplier.get().unwrap();

    assert_eq!(first.len(), 1);
    assert!(Arc::ptr_eq(&first, &second));
  }

  #[test]
  fn empty_static_supplier() {
    let supplier = StaticSupplier::default();
    assert!(supplier.get().unwrap().is_empty());
  }
}
