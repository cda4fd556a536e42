//! A human triage decision to be pushed to the upstream tracker.

use serde::{Deserialize, Serialize};

/// What a maintainer decided for one issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageDecision {
    /// Labels to add upstream.
    #[serde(default)]
    pub add_labels: Vec<String>,
    /// Milestone number to assign.
    #[serde(default)]
    pub milestone: Option<u64>,
    /// Comment to post.
    #[serde(default)]
    pub comment: Option<String>,
    /// Strip the untriaged label.
    #[serde(default = "default_true")]
    pub mark_triaged: bool,
    /// Close the issue after applying the rest.
    #[serde(default)]
    pub close: bool,
}

impl TriageDecision {
    /// A decision that only marks the issue triaged.
    pub fn mark_triaged() -> Self {
        Self {
            mark_triaged: true,
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.add_labels.push(label.into());
        self
    }

    pub fn with_milestone(mut self, milestone: u64) -> Self {
        self.milestone = Some(milestone);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn closing(mut self) -> Self {
        self.close = true;
        self
    }

    /// Comment text, if one is set and not blank.
    pub fn comment_text(&self) -> Option<&str> {
        self.comment
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

fn default_true() -> bool {
    true
}
