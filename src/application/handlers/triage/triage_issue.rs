//! TriageIssueHandler - classifies one upstream issue and persists the result.

use std::sync::Arc;

use super::prompt::build_triage_prompt;
use crate::domain::issue::{TrackedIssue, UpstreamIssue};
use crate::ports::{ClassificationError, IssueClassifier, IssueStore, StoreError};

/// What happened to the issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriageOutcome {
    /// A new tracked record was stored.
    Created(TrackedIssue),
    /// The URL was already tracked; the model was not called.
    AlreadyTracked(TrackedIssue),
}

impl TriageOutcome {
    pub fn issue(&self) -> &TrackedIssue {
        match self {
            TriageOutcome::Created(issue) | TriageOutcome::AlreadyTracked(issue) => issue,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("classification failed: {0}")]
    Classification(#[from] ClassificationError),

    #[error("store failed: {0}")]
    Store(#[from] StoreError),
}

/// Handler for triaging a single issue.
pub struct TriageIssueHandler {
    store: Arc<dyn IssueStore>,
    classifier: Arc<dyn IssueClassifier>,
    repository: String,
}

impl TriageIssueHandler {
    /// `repository` is the watched `owner/name`, used in the prompt.
    pub fn new(
        store: Arc<dyn IssueStore>,
        classifier: Arc<dyn IssueClassifier>,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            store,
            classifier,
            repository: repository.into(),
        }
    }

    pub async fn handle(&self, issue: &UpstreamIssue) -> Result<TriageOutcome, TriageError> {
        if let Some(existing) = self.store.get_by_url(&issue.url).await? {
            return Ok(TriageOutcome::AlreadyTracked(existing));
        }

        let prompt = build_triage_prompt(&self.repository, issue);
        let classification = self.classifier.classify(&prompt).await?;

        let record = TrackedIssue::from_classification(issue, classification);
        let created = self.store.create(&record).await?;

        tracing::info!(
            url = %created.url,
            number = created.number,
            bug = created.is_likely_a_bug,
            feature = created.is_likely_a_feature_request,
            question = created.is_how_to_question,
            "issue triaged"
        );
        Ok(TriageOutcome::Created(created))
    }
}
