//! Persistence of committed project snapshots.
//!
//! # Submodules
//!
//! - [`storage`] - On-disk snapshot store with an index and atomic writes
//! - [`types`] - Snapshot, index and error types

pub mod storage;
pub mod types;

pub use storage::SnapshotStore;
pub use types::*;
