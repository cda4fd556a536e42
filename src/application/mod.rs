//! Application layer - handlers and the scheduler that drives them.
//!
//! Handlers orchestrate domain operations across the ports. The scheduler
//! repeats the batch passes on a fixed interval.

pub mod handlers;
pub mod scheduler;

pub use handlers::{
    ApplyTriageDecisionHandler, PassError, RunSyncPassHandler, RunTriagePassHandler,
    SuggestAreaLabelsHandler, SyncPassReport, TriageIssueHandler, TriagePassReport,
};
pub use scheduler::{
    request_shutdown, PollingJob, PollingWorker, PollingWorkerConfig, DEFAULT_POLL_INTERVAL,
};
