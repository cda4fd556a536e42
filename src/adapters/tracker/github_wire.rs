//! GitHub REST payloads and their conversion into domain snapshots.

use serde::Deserialize;

use crate::domain::issue::{IssueComment, IssueState, UpstreamIssue};

#[derive(Debug, Clone, Deserialize)]
pub(super) struct GithubIssue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub labels: Vec<GithubLabel>,
    #[serde(default)]
    pub milestone: Option<GithubMilestone>,
    #[serde(default)]
    pub comments: u32,
    #[serde(default)]
    pub reactions: Option<GithubReactions>,
    /// Present only when the "issue" is a pull request.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct GithubLabel {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct GithubMilestone {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct GithubReactions {
    #[serde(rename = "+1", default)]
    pub plus_one: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct GithubUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct GithubComment {
    #[serde(default)]
    pub user: Option<GithubUser>,
    #[serde(default)]
    pub body: Option<String>,
}

impl GithubIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

impl From<GithubIssue> for UpstreamIssue {
    fn from(issue: GithubIssue) -> Self {
        let state = if issue.state.eq_ignore_ascii_case("closed") {
            IssueState::Closed
        } else {
            IssueState::Open
        };
        UpstreamIssue {
            number: issue.number,
            title: issue.title,
            body: issue.body.filter(|body| !body.trim().is_empty()),
            url: issue.html_url,
            state,
            labels: issue.labels.into_iter().map(|label| label.name).collect(),
            milestone: issue.milestone.map(|m| m.title),
            upvotes: issue.reactions.map(|r| r.plus_one).unwrap_or(0),
            comment_count: issue.comments,
            comments: Vec::new(),
        }
    }
}

impl From<GithubComment> for IssueComment {
    fn from(comment: GithubComment) -> Self {
        IssueComment {
            author: comment
                .user
                .map(|user| user.login)
                .unwrap_or_else(|| "ghost".to_string()),
            body: comment.body.unwrap_or_default(),
        }
    }
}
