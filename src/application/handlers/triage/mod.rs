//! Triage handlers.
//!
//! Classify untriaged upstream issues, persist the results and push human
//! decisions back upstream.

mod apply_triage_decision;
mod prompt;
mod run_triage_pass;
mod triage_issue;

pub use apply_triage_decision::{
    ApplyTriageDecisionError, ApplyTriageDecisionHandler, ApplyTriageDecisionResult,
};
pub use prompt::build_triage_prompt;
pub use run_triage_pass::{RunTriagePassHandler, TriagePassReport};
pub use triage_issue::{TriageError, TriageIssueHandler, TriageOutcome};
