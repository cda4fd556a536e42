//! Issue module - tracked issues, upstream snapshots and sync decisions.
//!
//! - `tracked_issue` - Persisted triage record
//! - `upstream_issue` - Read-only tracker snapshot
//! - `classification` - Model output and its normalization
//! - `diff` - Field comparison between the two shapes
//! - `sync_plan` - Create/update/remove resolution for one snapshot
//! - `area_labels` - Area label catalogue and suggestions
//! - `triage_decision` - Human decision pushed upstream

mod area_labels;
mod classification;
mod diff;
mod sync_plan;
mod tracked_issue;
mod triage_decision;
mod upstream_issue;

pub use area_labels::{AreaLabel, AreaLabelCatalogue, AreaLabelSuggestion};
pub use classification::ClassificationResult;
pub use diff::{diff_issue, same_label_set, IssueDiff, IssueField};
pub use sync_plan::{
    resolve_issue, PlannedRemoval, PlannedUpdate, RemovalReason, SyncAction, SyncPlan,
};
pub use tracked_issue::{TrackedIssue, AREA_LABEL_PREFIX};
pub use triage_decision::TriageDecision;
pub use upstream_issue::{IssueComment, IssueState, UpstreamIssue, UNTRIAGED_LABEL};
