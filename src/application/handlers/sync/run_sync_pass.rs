//! RunSyncPassHandler - removes and refreshes tracked issues from one upstream snapshot.
//!
//! # Steps
//!
//! 1. Read every tracked issue and every open upstream issue
//! 2. Resolve each tracked issue into a [`SyncPlan`]
//! 3. Run the removal and update sub-passes concurrently
//!
//! Each tracked issue lands in exactly one of remove, update or up to date,
//! so the two sub-passes never touch the same row.

use std::fmt;
use std::sync::Arc;

use crate::application::handlers::PassError;
use crate::domain::foundation::RunId;
use crate::domain::issue::{PlannedRemoval, PlannedUpdate, RemovalReason, SyncPlan};
use crate::ports::{IssueStore, IssueTracker, StoreError};

/// Page size for reading the tracked issues.
pub const DEFAULT_SYNC_PAGE_SIZE: u32 = 5000;

/// Counts for one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPassReport {
    pub run_id: RunId,
    pub removed_closed: usize,
    pub removed_triaged: usize,
    pub updated: usize,
    pub up_to_date: usize,
    /// Rows that disappeared before this pass got to them.
    pub already_removed: usize,
    pub failed: usize,
}

impl SyncPassReport {
    pub fn removed(&self) -> usize {
        self.removed_closed + self.removed_triaged
    }
}

impl fmt::Display for SyncPassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "removed_closed={} removed_triaged={} updated={} up_to_date={} already_removed={} failed={}",
            self.removed_closed,
            self.removed_triaged,
            self.updated,
            self.up_to_date,
            self.already_removed,
            self.failed
        )
    }
}

#[derive(Default)]
struct RemovalCounts {
    closed: usize,
    triaged: usize,
    already_removed: usize,
    failed: usize,
}

#[derive(Default)]
struct UpdateCounts {
    updated: usize,
    already_removed: usize,
    failed: usize,
}

enum Applied {
    Done,
    AlreadyRemoved,
    Failed,
}

/// Handler for one batch update/removal pass.
pub struct RunSyncPassHandler {
    tracker: Arc<dyn IssueTracker>,
    store: Arc<dyn IssueStore>,
    untriaged_label: String,
    page_size: u32,
}

impl RunSyncPassHandler {
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        store: Arc<dyn IssueStore>,
        untriaged_label: impl Into<String>,
    ) -> Self {
        Self {
            tracker,
            store,
            untriaged_label: untriaged_label.into(),
            page_size: DEFAULT_SYNC_PAGE_SIZE,
        }
    }

    /// Overrides the page size used to read tracked issues.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub async fn handle(&self) -> Result<SyncPassReport, PassError> {
        let mut report = SyncPassReport::default();
        tracing::info!(run_id = %report.run_id, "sync pass started");

        let tracked = self.store.list_all(self.page_size).await?;
        let upstream = self.tracker.list_open_issues(None).await?;
        let plan = SyncPlan::build(tracked, &upstream, &self.untriaged_label);

        for issue in &plan.up_to_date {
            tracing::debug!(url = %issue.url, "Issue {} is up to date", issue.url);
        }
        report.up_to_date = plan.up_to_date.len();

        let (removals, updates) = tokio::join!(
            self.remove_all(&plan.removals),
            self.update_all(&plan.updates)
        );

        report.removed_closed = removals.closed;
        report.removed_triaged = removals.triaged;
        report.updated = updates.updated;
        report.already_removed = removals.already_removed + updates.already_removed;
        report.failed = removals.failed + updates.failed;

        tracing::info!(run_id = %report.run_id, %report, "sync pass finished");
        Ok(report)
    }

    async fn remove_all(&self, removals: &[PlannedRemoval]) -> RemovalCounts {
        let mut counts = RemovalCounts::default();
        for removal in removals {
            match self.remove(removal).await {
                Applied::Done => match removal.reason {
                    RemovalReason::ClosedUpstream => counts.closed += 1,
                    RemovalReason::TriagedUpstream => counts.triaged += 1,
                },
                Applied::AlreadyRemoved => counts.already_removed += 1,
                Applied::Failed => counts.failed += 1,
            }
        }
        counts
    }

    async fn remove(&self, removal: &PlannedRemoval) -> Applied {
        let url = &removal.issue.url;
        tracing::info!(
            url = %url,
            reason = %removal.reason,
            "Removing issue {url} as it is {}.",
            removal.reason
        );

        let Some(id) = removal.issue.id else {
            tracing::error!(url = %url, "Tracked issue has no id, cannot remove");
            return Applied::Failed;
        };

        match self.store.delete(id).await {
            Ok(()) => Applied::Done,
            Err(StoreError::NotFound(_)) => {
                tracing::debug!(url = %url, "Issue already removed");
                Applied::AlreadyRemoved
            }
            Err(err) => {
                tracing::error!(url = %url, error = %err, "Failed to remove issue");
                Applied::Failed
            }
        }
    }

    async fn update_all(&self, updates: &[PlannedUpdate]) -> UpdateCounts {
        let mut counts = UpdateCounts::default();
        for update in updates {
            match self.update(update).await {
                Applied::Done => counts.updated += 1,
                Applied::AlreadyRemoved => counts.already_removed += 1,
                Applied::Failed => counts.failed += 1,
            }
        }
        counts
    }

    async fn update(&self, update: &PlannedUpdate) -> Applied {
        let url = &update.issue.url;
        tracing::info!(
            url = %url,
            fields = %update.diff,
            "Updating issue {url} with new details"
        );

        let Some(id) = update.issue.id else {
            tracing::error!(url = %url, "Tracked issue has no id, cannot update");
            return Applied::Failed;
        };

        match self.store.update(id, &update.issue).await {
            Ok(()) => Applied::Done,
            Err(StoreError::NotFound(_)) => Applied::AlreadyRemoved,
            Err(StoreError::Conflict { .. }) => match self.store.get(id).await {
                Ok(None) => {
                    tracing::debug!(url = %url, "Issue removed while updating");
                    Applied::AlreadyRemoved
                }
                Ok(Some(_)) => {
                    tracing::warn!(url = %url, "Update rejected as conflicting, retrying next pass");
                    Applied::Failed
                }
                Err(err) => {
                    tracing::error!(url = %url, error = %err, "Failed to re-check issue after conflict");
                    Applied::Failed
                }
            },
            Err(err) => {
                tracing::error!(url = %url, error = %err, "Failed to update issue");
                Applied::Failed
            }
        }
    }
}
