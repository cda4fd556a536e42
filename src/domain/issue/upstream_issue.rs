//! Upstream issue snapshot as reported by the issue tracker.
//!
//! These values are read-only to the triage core. The tracker adapter builds
//! them from its wire format; nothing here is ever written back except through
//! explicit tracker mutation calls.

use serde::{Deserialize, Serialize};

/// Label that marks an issue as waiting for a human triage decision.
pub const UNTRIAGED_LABEL: &str = "untriaged";

/// Open/closed state of an upstream issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    #[default]
    Open,
    Closed,
}

/// A single comment on an upstream issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueComment {
    /// Login of the comment author.
    pub author: String,
    /// Markdown body of the comment.
    pub body: String,
}

impl IssueComment {
    pub fn new(author: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            body: body.into(),
        }
    }
}

/// Snapshot of an issue on the upstream tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamIssue {
    /// Tracker-assigned issue number.
    pub number: u64,
    /// Issue title.
    pub title: String,
    /// Issue body, absent when the author left it empty.
    pub body: Option<String>,
    /// Canonical HTML URL; the join key against tracked issues.
    pub url: String,
    /// Open or closed.
    pub state: IssueState,
    /// Label names in tracker order.
    pub labels: Vec<String>,
    /// Milestone title, if one is assigned.
    pub milestone: Option<String>,
    /// Count of `+1` reactions.
    pub upvotes: u32,
    /// Number of comments reported by the tracker.
    pub comment_count: u32,
    /// Comment thread, only populated when explicitly fetched.
    #[serde(default)]
    pub comments: Vec<IssueComment>,
}

impl UpstreamIssue {
    /// Creates an open issue with no labels, milestone, votes or comments.
    pub fn new(number: u64, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            body: None,
            url: url.into(),
            state: IssueState::Open,
            labels: Vec::new(),
            milestone: None,
            upvotes: 0,
            comment_count: 0,
            comments: Vec::new(),
        }
    }

    /// Sets the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Adds a label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Sets the milestone title.
    pub fn with_milestone(mut self, milestone: impl Into<String>) -> Self {
        self.milestone = Some(milestone.into());
        self
    }

    /// Sets the upvote count.
    pub fn with_upvotes(mut self, upvotes: u32) -> Self {
        self.upvotes = upvotes;
        self
    }

    /// Sets the state.
    pub fn with_state(mut self, state: IssueState) -> Self {
        self.state = state;
        self
    }

    /// Appends a comment and bumps the comment count.
    pub fn with_comment(mut self, comment: IssueComment) -> Self {
        self.comments.push(comment);
        self.comment_count = self.comment_count.max(self.comments.len() as u32);
        self
    }

    /// Returns true if the issue carries a label with exactly this name.
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|label| label == name)
    }

    pub fn is_open(&self) -> bool {
        self.state == IssueState::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let issue = UpstreamIssue::new(42, "Crash on start", "https://example.test/issues/42")
            .with_body("Stack trace attached")
            .with_label("bug")
            .with_label(UNTRIAGED_LABEL)
            .with_milestone("9.0")
            .with_upvotes(7);

        assert_eq!(issue.number, 42);
        assert_eq!(issue.body.as_deref(), Some("Stack trace attached"));
        assert_eq!(issue.labels, vec!["bug", "untriaged"]);
        assert_eq!(issue.milestone.as_deref(), Some("9.0"));
        assert_eq!(issue.upvotes, 7);
        assert!(issue.is_open());
    }

    #[test]
    fn has_label_matches_exact_name_only() {
        let issue = UpstreamIssue::new(1, "t", "u").with_label("untriaged-later");
        assert!(!issue.has_label(UNTRIAGED_LABEL));
        assert!(issue.has_label("untriaged-later"));
    }

    #[test]
    fn with_comment_tracks_count() {
        let issue = UpstreamIssue::new(1, "t", "u")
            .with_comment(IssueComment::new("alice", "same here"))
            .with_comment(IssueComment::new("bob", "+1"));
        assert_eq!(issue.comment_count, 2);
        assert_eq!(issue.comments[1].author, "bob");
    }

    #[test]
    fn state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&IssueState::Closed).unwrap(), "\"closed\"");
    }
}
