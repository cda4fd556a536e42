//! In-memory issue tracker for tests and local runs.
//!
//! Holds a fixed set of upstream issues, applies mutations to them and records
//! every mutation for assertions.
//!
//! # Panics
//!
//! Methods panic if internal locks are poisoned.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::issue::{IssueComment, IssueState, UpstreamIssue};
use crate::ports::{IssueTracker, TrackerError};

/// A mutation applied through the tracker port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerMutation {
    AddLabel { number: u64, label: String },
    RemoveLabel { number: u64, label: String },
    AddComment { number: u64, body: String },
    AssignMilestone { number: u64, milestone: u64 },
    Close { number: u64 },
}

/// In-memory tracker keyed by issue number.
#[derive(Default)]
pub struct InMemoryTracker {
    issues: RwLock<BTreeMap<u64, UpstreamIssue>>,
    milestones: RwLock<HashMap<u64, String>>,
    mutations: RwLock<Vec<TrackerMutation>>,
    fail_listing: AtomicBool,
    list_calls: AtomicUsize,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracker seeded with the given issues.
    pub fn with_issues(issues: impl IntoIterator<Item = UpstreamIssue>) -> Self {
        let tracker = Self::new();
        for issue in issues {
            tracker.upsert(issue);
        }
        tracker
    }

    /// Inserts or replaces an issue.
    pub fn upsert(&self, issue: UpstreamIssue) {
        self.issues
            .write()
            .expect("InMemoryTracker: issues lock poisoned")
            .insert(issue.number, issue);
    }

    /// Names a milestone so assignments show its title.
    pub fn define_milestone(&self, id: u64, title: impl Into<String>) {
        self.milestones
            .write()
            .expect("InMemoryTracker: milestones lock poisoned")
            .insert(id, title.into());
    }

    /// Makes every following list call fail with a network error.
    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Returns the current state of an issue.
    pub fn issue(&self, number: u64) -> Option<UpstreamIssue> {
        self.issues
            .read()
            .expect("InMemoryTracker: issues lock poisoned")
            .get(&number)
            .cloned()
    }

    /// Returns every recorded mutation in call order.
    pub fn mutations(&self) -> Vec<TrackerMutation> {
        self.mutations
            .read()
            .expect("InMemoryTracker: mutations lock poisoned")
            .clone()
    }

    /// Number of `list_open_issues` calls so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn mutate<F>(&self, number: u64, mutation: TrackerMutation, apply: F) -> Result<(), TrackerError>
    where
        F: FnOnce(&mut UpstreamIssue),
    {
        let mut issues = self
            .issues
            .write()
            .expect("InMemoryTracker: issues lock poisoned");
        let issue = issues.get_mut(&number).ok_or(TrackerError::NotFound(number))?;
        apply(issue);
        self.mutations
            .write()
            .expect("InMemoryTracker: mutations lock poisoned")
            .push(mutation);
        Ok(())
    }
}

/// Issue reads carry the comment count only, like the REST API.
fn without_thread(mut issue: UpstreamIssue) -> UpstreamIssue {
    issue.comments.clear();
    issue
}

#[async_trait]
impl IssueTracker for InMemoryTracker {
    async fn list_open_issues(
        &self,
        label_filter: Option<&str>,
    ) -> Result<Vec<UpstreamIssue>, TrackerError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(TrackerError::Network("listing disabled".to_string()));
        }
        let issues = self
            .issues
            .read()
            .expect("InMemoryTracker: issues lock poisoned");
        Ok(issues
            .values()
            .filter(|issue| issue.is_open())
            .filter(|issue| label_filter.map_or(true, |label| issue.has_label(label)))
            .cloned()
            .map(without_thread)
            .collect())
    }

    async fn get_issue(&self, number: u64) -> Result<UpstreamIssue, TrackerError> {
        self.issue(number)
            .map(without_thread)
            .ok_or(TrackerError::NotFound(number))
    }

    async fn get_comments(&self, number: u64) -> Result<Vec<IssueComment>, TrackerError> {
        self.issue(number)
            .map(|issue| issue.comments)
            .ok_or(TrackerError::NotFound(number))
    }

    async fn add_label(&self, number: u64, label: &str) -> Result<(), TrackerError> {
        let mutation = TrackerMutation::AddLabel {
            number,
            label: label.to_string(),
        };
        self.mutate(number, mutation, |issue| {
            if !issue.has_label(label) {
                issue.labels.push(label.to_string());
            }
        })
    }

    async fn remove_label(&self, number: u64, label: &str) -> Result<(), TrackerError> {
        let mutation = TrackerMutation::RemoveLabel {
            number,
            label: label.to_string(),
        };
        self.mutate(number, mutation, |issue| issue.labels.retain(|l| l != label))
    }

    async fn add_comment(&self, number: u64, body: &str) -> Result<(), TrackerError> {
        let mutation = TrackerMutation::AddComment {
            number,
            body: body.to_string(),
        };
        self.mutate(number, mutation, |issue| {
            issue.comments.push(IssueComment::new("triage-sync", body));
            issue.comment_count += 1;
        })
    }

    async fn assign_milestone(&self, number: u64, milestone: u64) -> Result<(), TrackerError> {
        let title = self
            .milestones
            .read()
            .expect("InMemoryTracker: milestones lock poisoned")
            .get(&milestone)
            .cloned()
            .unwrap_or_else(|| milestone.to_string());
        self.mutate(
            number,
            TrackerMutation::AssignMilestone { number, milestone },
            |issue| issue.milestone = Some(title),
        )
    }

    async fn close_issue(&self, number: u64) -> Result<(), TrackerError> {
        self.mutate(number, TrackerMutation::Close { number }, |issue| {
            issue.state = IssueState::Closed
        })
    }
}
