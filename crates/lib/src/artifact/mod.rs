//! Built target model.
//!
//! Immutable value types describing what one built target produced, as
//! reported by the build aspect:
//!
//! - [`Label`]: identifies a target in the build graph
//! - [`TargetBuildInfo`]: one built target and its optional per-language payloads
//! - [`JavaArtifactInfo`] / [`CcCompilationInfo`]: per-language facts
//!
//! # Submodules
//!
//! - [`aspect`] - Parsing of aspect output files into the model

pub mod aspect;
mod label;
mod types;

pub use label::{Label, LabelError};
pub use types::*;
