//! ApplyTriageDecisionHandler - pushes a maintainer's decision to the tracker.
//!
//! Upstream mutations run in a fixed order: labels, milestone, comment,
//! untriaged label removal, close. The tracked row is deleted last since the
//! issue is now human-triaged.

use std::sync::Arc;

use crate::domain::issue::TriageDecision;
use crate::ports::{IssueStore, IssueTracker, StoreError, TrackerError};

/// Result of applying a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyTriageDecisionResult {
    /// True when a tracked row was found and deleted.
    pub removed_tracked: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ApplyTriageDecisionError {
    #[error("tracker rejected the decision: {0}")]
    Tracker(#[from] TrackerError),

    #[error("failed to drop tracked issue: {0}")]
    Store(#[from] StoreError),
}

/// Handler for applying a triage decision upstream.
pub struct ApplyTriageDecisionHandler {
    tracker: Arc<dyn IssueTracker>,
    store: Arc<dyn IssueStore>,
    untriaged_label: String,
}

impl ApplyTriageDecisionHandler {
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        store: Arc<dyn IssueStore>,
        untriaged_label: impl Into<String>,
    ) -> Self {
        Self {
            tracker,
            store,
            untriaged_label: untriaged_label.into(),
        }
    }

    pub async fn handle(
        &self,
        number: u64,
        decision: &TriageDecision,
    ) -> Result<ApplyTriageDecisionResult, ApplyTriageDecisionError> {
        for label in &decision.add_labels {
            self.tracker.add_label(number, label).await?;
        }
        if let Some(milestone) = decision.milestone {
            self.tracker.assign_milestone(number, milestone).await?;
        }
        if let Some(comment) = decision.comment_text() {
            self.tracker.add_comment(number, comment).await?;
        }
        if decision.mark_triaged {
            self.tracker
                .remove_label(number, &self.untriaged_label)
                .await?;
        }
        if decision.close {
            self.tracker.close_issue(number).await?;
        }

        let removed_tracked = match self.store.get_by_number(number).await? {
            Some(tracked) => match tracked.id {
                Some(id) => match self.store.delete(id).await {
                    Ok(()) | Err(StoreError::NotFound(_)) => true,
                    Err(err) => return Err(err.into()),
                },
                None => false,
            },
            None => false,
        };

        tracing::info!(
            number,
            labels = decision.add_labels.len(),
            closed = decision.close,
            removed_tracked,
            "triage decision applied"
        );
        Ok(ApplyTriageDecisionResult { removed_tracked })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryIssueStore, InMemoryTracker, TrackerMutation};
    use crate::domain::issue::{IssueState, TrackedIssue, UpstreamIssue, UNTRIAGED_LABEL};

    const URL: &str = "https://github.com/o/r/issues/3";

    async fn setup() -> (Arc<InMemoryTracker>, Arc<InMemoryIssueStore>) {
        let tracker = Arc::new(InMemoryTracker::with_issues([
            UpstreamIssue::new(3, "Crash", URL).with_label(UNTRIAGED_LABEL)
        ]));
        let store = Arc::new(InMemoryIssueStore::new());
        store
            .create(&TrackedIssue {
                title: "Crash".to_string(),
                url: URL.to_string(),
                number: 3,
                labels: vec![UNTRIAGED_LABEL.to_string()],
                ..Default::default()
            })
            .await
            .unwrap();
        (tracker, store)
    }

    #[tokio::test]
    async fn applies_mutations_in_order_and_drops_row() {
        let (tracker, store) = setup().await;
        let handler = ApplyTriageDecisionHandler::new(tracker.clone(), store.clone(), UNTRIAGED_LABEL);
        let decision = TriageDecision::mark_triaged()
            .with_label("area-docs")
            .with_milestone(4)
            .with_comment("Thanks for the report")
            .closing();

        let result = handler.handle(3, &decision).await.unwrap();

        assert!(result.removed_tracked);
        assert!(store.is_empty());
        assert_eq!(
            tracker.mutations(),
            vec![
                TrackerMutation::AddLabel { number: 3, label: "area-docs".to_string() },
                TrackerMutation::AssignMilestone { number: 3, milestone: 4 },
                TrackerMutation::AddComment { number: 3, body: "Thanks for the report".to_string() },
                TrackerMutation::RemoveLabel { number: 3, label: UNTRIAGED_LABEL.to_string() },
                TrackerMutation::Close { number: 3 },
            ]
        );
        let upstream = tracker.issue(3).unwrap();
        assert_eq!(upstream.state, IssueState::Closed);
        assert_eq!(upstream.labels, vec!["area-docs"]);
    }

    #[tokio::test]
    async fn blank_comment_is_not_posted() {
        let (tracker, store) = setup().await;
        let handler = ApplyTriageDecisionHandler::new(tracker.clone(), store, UNTRIAGED_LABEL);

        handler
            .handle(3, &TriageDecision::mark_triaged().with_comment("   "))
            .await
            .unwrap();

        assert_eq!(tracker.mutations().len(), 1);
    }

    #[tokio::test]
    async fn untracked_issue_still_applies_upstream() {
        let (tracker, _) = setup().await;
        let empty = Arc::new(InMemoryIssueStore::new());
        let handler = ApplyTriageDecisionHandler::new(tracker.clone(), empty, UNTRIAGED_LABEL);

        let result = handler
            .handle(3, &TriageDecision::mark_triaged())
            .await
            .unwrap();

        assert!(!result.removed_tracked);
        assert!(!tracker.issue(3).unwrap().has_label(UNTRIAGED_LABEL));
    }

    #[tokio::test]
    async fn tracker_failure_keeps_tracked_row() {
        let (tracker, store) = setup().await;
        let handler = ApplyTriageDecisionHandler::new(tracker, store.clone(), UNTRIAGED_LABEL);

        let result = handler.handle(99, &TriageDecision::mark_triaged()).await;

        assert!(matches!(
            result,
            Err(ApplyTriageDecisionError::Tracker(TrackerError::NotFound(99)))
        ));
        assert_eq!(store.len(), 1);
    }
}
