//! qsync-lib: incremental synchronization of an IDE project model from build output.
//!
//! Built-target facts flow in one direction:
//! - [`deps`]: suppliers of the targets known to be built
//! - [`ops`]: update operations, each staging one kind of fact
//! - [`project`]: the project model and its per-pass staging accumulator
//! - [`sync`]: the orchestrator running passes and publishing snapshots
//! - [`snapshot`]: persistence of committed snapshots

pub mod artifact;
pub mod config;
pub mod consts;
pub mod deps;
pub mod formatter;
pub mod ops;
pub mod platform;
pub mod project;
pub mod snapshot;
pub mod store_lock;
pub mod sync;
#[cfg(test)]
mod util;
