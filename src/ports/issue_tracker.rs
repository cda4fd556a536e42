//! Issue tracker port.
//!
//! Read and mutation contract for the upstream issue tracker (GitHub in
//! production). All operations target the single watched repository the
//! adapter was configured with.

use async_trait::async_trait;

use crate::domain::issue::{IssueComment, UpstreamIssue};

/// Port for the upstream issue tracker.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Lists every open issue, optionally restricted to those carrying a label.
    ///
    /// Pull requests are never returned.
    async fn list_open_issues(
        &self,
        label_filter: Option<&str>,
    ) -> Result<Vec<UpstreamIssue>, TrackerError>;

    /// Fetches one issue by number.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the issue does not exist
    async fn get_issue(&self, number: u64) -> Result<UpstreamIssue, TrackerError>;

    /// Fetches the comment thread of an issue in posting order.
    async fn get_comments(&self, number: u64) -> Result<Vec<IssueComment>, TrackerError>;

    async fn add_label(&self, number: u64, label: &str) -> Result<(), TrackerError>;

    /// Removes a label. Removing a label the issue does not carry succeeds.
    async fn remove_label(&self, number: u64, label: &str) -> Result<(), TrackerError>;

    async fn add_comment(&self, number: u64, body: &str) -> Result<(), TrackerError>;

    async fn assign_milestone(&self, number: u64, milestone: u64) -> Result<(), TrackerError>;

    async fn close_issue(&self, number: u64) -> Result<(), TrackerError>;
}

/// Tracker errors.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("issue #{0} not found")]
    NotFound(u64),

    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("network error: {0}")]
    Network(String),

    #[error("tracker api error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

impl TrackerError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Returns true if repeating the request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TrackerError::RateLimited { .. } | TrackerError::Network(_) => true,
            TrackerError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
