//! Error shared by the batch passes.

use crate::ports::{StoreError, TrackerError};

/// A failure that aborts a whole pass.
///
/// Only the initial snapshot reads can fail a pass; per-issue failures are
/// logged and counted in the pass report instead.
#[derive(Debug, thiserror::Error)]
pub enum PassError {
    #[error("failed to read upstream issues: {0}")]
    Tracker(#[from] TrackerError),

    #[error("failed to read tracked issues: {0}")]
    Store(#[from] StoreError),
}
