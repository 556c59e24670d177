//! Project model and its incremental update.
//!
//! [`Project`] is the immutable model handed to downstream tooling.
//! [`ProjectProtoUpdate`] stages one pass worth of additions on top of a base
//! project and produces the next [`Project`] when built.

mod types;
mod update;

pub use types::*;
pub use update::{CcWorkspaceBuilder, LibraryBuilder, ModuleBuilder, ProjectProtoUpdate};
