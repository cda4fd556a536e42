//! Per-issue synchronization decisions for one upstream snapshot.
//!
//! Every tracked issue resolves to exactly one action, evaluated against the
//! same snapshot. Removal takes precedence: an issue that is closed or triaged
//! upstream is never also scheduled for a field update.

use std::collections::HashMap;
use std::fmt;

use super::diff::{diff_issue, IssueDiff};
use super::tracked_issue::TrackedIssue;
use super::upstream_issue::UpstreamIssue;

/// Why a tracked issue leaves the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalReason {
    /// No open upstream issue has the tracked URL.
    ClosedUpstream,
    /// The upstream issue is open but no longer labeled untriaged.
    TriagedUpstream,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalReason::ClosedUpstream => f.write_str("closed"),
            RemovalReason::TriagedUpstream => f.write_str("triaged"),
        }
    }
}

/// Resolution for a single tracked issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    Remove(RemovalReason),
    Update(IssueDiff),
    UpToDate,
}

/// Decides what to do with `tracked` given its upstream match, if any.
pub fn resolve_issue(
    tracked: &TrackedIssue,
    upstream: Option<&UpstreamIssue>,
    untriaged_label: &str,
) -> SyncAction {
    let Some(upstream) = upstream.filter(|issue| issue.is_open()) else {
        return SyncAction::Remove(RemovalReason::ClosedUpstream);
    };
    if !upstream.has_label(untriaged_label) {
        return SyncAction::Remove(RemovalReason::TriagedUpstream);
    }

    let diff = diff_issue(tracked, upstream);
    if diff.is_empty() {
        SyncAction::UpToDate
    } else {
        SyncAction::Update(diff)
    }
}

/// A tracked issue scheduled for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRemoval {
    pub issue: TrackedIssue,
    pub reason: RemovalReason,
}

/// A tracked issue with upstream fields already applied, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpdate {
    pub issue: TrackedIssue,
    pub diff: IssueDiff,
}

/// All decisions for one snapshot, split by action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub removals: Vec<PlannedRemoval>,
    pub updates: Vec<PlannedUpdate>,
    pub up_to_date: Vec<TrackedIssue>,
}

impl SyncPlan {
    /// Resolves every tracked issue against the upstream snapshot.
    ///
    /// When the snapshot lists the same URL twice, the first entry wins.
    pub fn build(
        tracked: Vec<TrackedIssue>,
        upstream: &[UpstreamIssue],
        untriaged_label: &str,
    ) -> Self {
        let mut by_url: HashMap<&str, &UpstreamIssue> = HashMap::with_capacity(upstream.len());
        for issue in upstream {
            by_url.entry(issue.url.as_str()).or_insert(issue);
        }

        let mut plan = SyncPlan::default();
        for mut issue in tracked {
            let matched = by_url.get(issue.url.as_str()).copied();
            match resolve_issue(&issue, matched, untriaged_label) {
                SyncAction::Remove(reason) => plan.removals.push(PlannedRemoval { issue, reason }),
                SyncAction::Update(diff) => {
                    if let Some(source) = matched {
                        issue.apply_upstream(source);
                    }
                    plan.updates.push(PlannedUpdate { issue, diff });
                }
                SyncAction::UpToDate => plan.up_to_date.push(issue),
            }
        }
        plan
    }

    /// Total number of tracked issues covered by the plan.
    pub fn len(&self) -> usize {
        self.removals.len() + self.updates.len() + self.up_to_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
