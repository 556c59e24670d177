mod format;
mod snapshot;
mod status;
mod sync;

pub use format::{FormatArgs, cmd_format};
pub use snapshot::{SnapshotCommand, cmd_snapshot};
pub use status::cmd_status;
pub use sync::{SyncArgs, cmd_sync};
