mod common;
mod snapshot_tests;
mod sync_tests;
