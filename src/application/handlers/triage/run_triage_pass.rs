//! RunTriagePassHandler - classifies every untriaged upstream issue not yet tracked.
//!
//! # Steps
//!
//! 1. List open upstream issues carrying the untriaged label
//! 2. Collect the URLs already tracked
//! 3. For each new issue, in upstream order: fetch its comments, then triage it
//!
//! A failure on one issue is logged and counted; the pass moves on. Only the
//! two snapshot reads can fail the pass.

use std::fmt;
use std::sync::Arc;

use super::triage_issue::{TriageIssueHandler, TriageOutcome};
use crate::application::handlers::PassError;
use crate::domain::foundation::RunId;
use crate::domain::issue::UpstreamIssue;
use crate::ports::{IssueStore, IssueTracker};

/// Counts for one triage pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriagePassReport {
    pub run_id: RunId,
    /// Untriaged upstream issues seen.
    pub fetched: usize,
    /// Issues already tracked.
    pub skipped: usize,
    /// Issues classified and stored.
    pub triaged: usize,
    /// Issues that failed and will be retried next pass.
    pub failed: usize,
}

impl fmt::Display for TriagePassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetched={} skipped={} triaged={} failed={}",
            self.fetched, self.skipped, self.triaged, self.failed
        )
    }
}

/// Handler for one batch triage pass.
pub struct RunTriagePassHandler {
    tracker: Arc<dyn IssueTracker>,
    store: Arc<dyn IssueStore>,
    triage: TriageIssueHandler,
    untriaged_label: String,
}

impl RunTriagePassHandler {
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        store: Arc<dyn IssueStore>,
        triage: TriageIssueHandler,
        untriaged_label: impl Into<String>,
    ) -> Self {
        Self {
            tracker,
            store,
            triage,
            untriaged_label: untriaged_label.into(),
        }
    }

    pub async fn handle(&self) -> Result<TriagePassReport, PassError> {
        let mut report = TriagePassReport::default();
        tracing::info!(run_id = %report.run_id, "triage pass started");

        let untriaged = self
            .tracker
            .list_open_issues(Some(&self.untriaged_label))
            .await?;
        let tracked_urls = self.store.list_all_urls().await?;
        report.fetched = untriaged.len();
        let total = untriaged.len();

        for (index, issue) in untriaged.into_iter().enumerate() {
            let position = index + 1;
            if tracked_urls.contains(&issue.url) {
                tracing::info!(url = %issue.url, "Issue {position}/{total} already processed");
                report.skipped += 1;
                continue;
            }

            tracing::info!(url = %issue.url, "Processing issue {position}/{total}");
            match self.triage_one(issue).await {
                Some(TriageOutcome::Created(_)) => report.triaged += 1,
                Some(TriageOutcome::AlreadyTracked(_)) => report.skipped += 1,
                None => report.failed += 1,
            }
        }

        tracing::info!(run_id = %report.run_id, %report, "triage pass finished");
        Ok(report)
    }

    /// Triages a single issue, logging any failure.
    async fn triage_one(&self, mut issue: UpstreamIssue) -> Option<TriageOutcome> {
        if issue.comment_count > 0 && issue.comments.is_empty() {
            match self.tracker.get_comments(issue.number).await {
                Ok(comments) => issue.comments = comments,
                Err(err) => {
                    tracing::error!(url = %issue.url, error = %err, "Failed to fetch comments");
                    return None;
                }
            }
        }

        match self.triage.handle(&issue).await {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                tracing::error!(url = %issue.url, error = %err, "Failed to triage issue");
                None
            }
        }
    }
}
