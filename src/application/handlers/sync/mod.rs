//! Sync handlers.
//!
//! Keep tracked issues in step with the upstream tracker.

mod run_sync_pass;

pub use run_sync_pass::{RunSyncPassHandler, SyncPassReport, DEFAULT_SYNC_PAGE_SIZE};
