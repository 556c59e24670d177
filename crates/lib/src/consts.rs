//! Crate-wide constants.

/// Application name, used for directory names under the platform data/config roots.
pub const APP_NAME: &str = "qsync";

/// File suffix of aspect output files describing one or more built targets.
pub const ASPECT_OUTPUT_SUFFIX: &str = ".qsync.json";

/// Name of the module that collects workspace-wide contributions.
pub const WORKSPACE_MODULE_NAME: &str = ".workspace";

/// Name of the library that collects dependency jars.
pub const DEPENDENCIES_LIBRARY: &str = ".dependencies";

/// Default number of concurrent aspect output reads.
pub const DEFAULT_PARALLELISM: usize = 4;

/// Default timeout for the external BUILD file formatter, in seconds.
pub const DEFAULT_FORMATTER_TIMEOUT_SECS: u64 = 30;
