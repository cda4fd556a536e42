//! Application handlers.
//!
//! Command and query handlers that orchestrate the issue ports.

pub mod labels;
mod pass_error;
pub mod sync;
pub mod triage;

pub use labels::{build_area_label_prompt, SuggestAreaLabelsHandler};
pub use pass_error::PassError;
pub use sync::{RunSyncPassHandler, SyncPassReport, DEFAULT_SYNC_PAGE_SIZE};
pub use triage::{
    build_triage_prompt, ApplyTriageDecisionError, ApplyTriageDecisionHandler,
    ApplyTriageDecisionResult, RunTriagePassHandler, TriageError, TriageIssueHandler,
    TriageOutcome, TriagePassReport,
};
