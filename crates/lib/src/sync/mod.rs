//! Update pipeline.
//!
//! [`ProjectSync`] runs the registered update operations, in registration
//! order, against a fresh [`ProjectProtoUpdate`] built from the base project,
//! and publishes the result as a new [`ProjectSnapshot`]. A pass either
//! commits completely or not at all:
//!
//! - passes are serialized by a mutex held for the whole pass;
//! - the accumulator is private to the pass and dropped on failure;
//! - publishing swaps an `Arc` under a write lock, so readers of
//!   [`ProjectSync::current`] see the old snapshot or the new one, never a mix.
//!
//! After a failed pass the previous snapshot stays current and is reported
//! stale until the next successful pass. Cancelled passes do not mark it stale.

mod types;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::deps::{MalformedPolicy, SharedSupplier};
use crate::ops::{ProjectProtoUpdateOperation, default_operations};
use crate::project::{Project, ProjectProtoUpdate};
use crate::snapshot::ProjectSnapshot;

pub use types::{SyncError, SyncStatus};

pub struct ProjectSync {
  supplier: SharedSupplier,
  operations: Vec<Box<dyn ProjectProtoUpdateOperation>>,
  base: RwLock<Arc<Project>>,
  current: RwLock<Arc<ProjectSnapshot>>,
  pass_lock: Mutex<()>,
  stale: AtomicBool,
}

impl ProjectSync {
  /// Create a sync with no operations. The base project becomes generation 0.
  pub fn new(supplier: SharedSupplier, base: Project) -> Result<Self, SyncError> {
    let initial = ProjectSnapshot::new(0, 0, base.clone()).map_err(SyncError::Snapshot)?;
    Ok(Self {
      supplier,
      operations: Vec::new(),
      base: RwLock::new(Arc::new(base)),
      current: RwLock::new(Arc::new(initial)),
      pass_lock: Mutex::new(()),
      stale: AtomicBool::new(false),
    })
  }

  /// Continue from a previously committed snapshot; the next pass gets its generation + 1.
  pub fn resume(self, snapshot: ProjectSnapshot, stale: bool) -> Self {
    *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
    self.stale.store(stale, Ordering::SeqCst);
    self
  }

  /// Register the built-in operations, applying `policy` to those that validate entries.
  pub fn with_default_operations(mut self, policy: MalformedPolicy) -> Self {
    for op in default_operations(self.supplier.clone(), policy) {
      self.register(op);
    }
    self
  }

  /// Append an operation. Operations run in registration order.
  pub fn register(&mut self, op: Box<dyn ProjectProtoUpdateOperation>) -> &mut Self {
    debug!(operation = op.name(), position = self.operations.len(), "registered update operation");
    self.operations.push(op);
    self
  }

  pub fn operation_names(&self) -> impl Iterator<Item = &str> {
    self.operations.iter().map(|op| op.name())
  }

  /// Replace the base project used by subsequent passes. The current snapshot is unchanged.
  pub fn set_base(&self, project: Project) {
    let _pass = self.pass_lock.lock().unwrap_or_else(PoisonError::into_inner);
    *self.base.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(project);
  }

  pub fn current(&self) -> Arc<ProjectSnapshot> {
    self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
  }

  pub fn is_stale(&self) -> bool {
    self.stale.load(Ordering::SeqCst)
  }

  pub fn status(&self) -> SyncStatus {
    let current = self.current();
    SyncStatus {
      snapshot_id: current.id.clone(),
      generation: current.generation,
      digest: current.digest.clone(),
      target_count: current.target_count,
      stale: self.is_stale(),
    }
  }

  /// Run one pass and publish its result.
  ///
  /// The supplier's memoized result is invalidated when the pass ends,
  /// whether it committed or not.
  pub fn run_pass(&self, cancel: &CancellationToken) -> Result<Arc<ProjectSnapshot>, SyncError> {
    let _pass = self.pass_lock.lock().unwrap_or_else(PoisonError::into_inner);
    let start = Instant::now();

    let result = self.execute(cancel);
    self.supplier.invalidate();

    match result {
      Ok(snapshot) => {
        let snapshot = Arc::new(snapshot);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
        self.stale.store(false, Ordering::SeqCst);
        info!(
          generation = snapshot.generation,
          targets = snapshot.target_count,
          digest = %snapshot.digest,
          elapsed = ?start.elapsed(),
          "committed project snapshot"
        );
        Ok(snapshot)
      }
      Err(SyncError::Cancelled) => {
        info!("sync pass cancelled, keeping previous snapshot");
        Err(SyncError::Cancelled)
      }
      Err(err) => {
        self.stale.store(true, Ordering::SeqCst);
        warn!(error = %err, "sync pass aborted, previous snapshot is now stale");
        Err(err)
      }
    }
  }

  fn execute(&self, cancel: &CancellationToken) -> Result<ProjectSnapshot, SyncError> {
    if cancel.is_cancelled() {
      return Err(SyncError::Cancelled);
    }

    let target_count = self
      .supplier
      .get()
      .map_err(|e| SyncError::from_build(None, e))?
      .len();

    let base = self.base.read().unwrap_or_else(PoisonError::into_inner).clone();
    let mut update = ProjectProtoUpdate::new(&base);

    for op in &self.operations {
      if cancel.is_cancelled() {
        return Err(SyncError::Cancelled);
      }
      debug!(operation = op.name(), "running update operation");
      op.update(&mut update)
        .map_err(|e| SyncError::from_build(Some(op.name()), e))?;
    }

    if cancel.is_cancelled() {
      return Err(SyncError::Cancelled);
    }

    let generation = self.current().generation + 1;
    ProjectSnapshot::new(generation, target_count, update.build()).map_err(SyncError::Snapshot)
  }
}
