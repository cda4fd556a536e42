//! Integration tests for the batch update/removal pass.
//!
//! Seeds tracked rows in the in-memory store, shapes the upstream snapshot in
//! the in-memory tracker and checks the store after one pass.

use std::sync::Arc;

use triage_sync::adapters::{InMemoryIssueStore, InMemoryTracker};
use triage_sync::application::{ApplyTriageDecisionHandler, RunSyncPassHandler};
use triage_sync::domain::issue::{
    IssueState, TrackedIssue, TriageDecision, UpstreamIssue, UNTRIAGED_LABEL,
};
use triage_sync::ports::IssueStore;

// =============================================================================
// Test Infrastructure
// =============================================================================

fn url(number: u64) -> String {
    format!("https://github.com/dotnet/aspire/issues/{number}")
}

fn tracked(number: u64, title: &str) -> TrackedIssue {
    TrackedIssue {
        title: title.to_string(),
        url: url(number),
        number,
        labels: vec![UNTRIAGED_LABEL.to_string()],
        is_how_to_question: true,
        summary: Some("How do I configure it?".to_string()),
        reasoning: Some("Phrased as a question".to_string()),
        ..Default::default()
    }
}

fn upstream(number: u64, title: &str) -> UpstreamIssue {
    UpstreamIssue::new(number, title, url(number)).with_label(UNTRIAGED_LABEL)
}

async fn store_with(issues: Vec<TrackedIssue>) -> Arc<InMemoryIssueStore> {
    let store = Arc::new(InMemoryIssueStore::new());
    for issue in &issues {
        store.create(issue).await.unwrap();
    }
    store
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn scenario_42_title_labels_and_upvotes_follow_upstream() {
    let mut old = tracked(42, "Old");
    old.labels.push("bug".to_string());
    old.upvotes = 3;
    let store = store_with(vec![old]).await;
    let tracker = Arc::new(InMemoryTracker::with_issues([upstream(42, "New")
        .with_label("area-docs")
        .with_label("bug")
        .with_upvotes(7)]));

    let report = RunSyncPassHandler::new(tracker, store.clone(), UNTRIAGED_LABEL)
        .handle()
        .await
        .unwrap();

    assert_eq!(report.updated, 1);
    let row = store.get_by_url(&url(42)).await.unwrap().unwrap();
    assert_eq!(row.title, "New");
    assert_eq!(row.upvotes, 7);
    let mut labels = row.labels.clone();
    labels.sort();
    assert_eq!(labels, vec!["area-docs", "bug", UNTRIAGED_LABEL]);
    assert!(row.is_how_to_question);
    assert_eq!(row.summary.as_deref(), Some("How do I configure it?"));
    assert_eq!(row.reasoning.as_deref(), Some("Phrased as a question"));
}

#[tokio::test]
async fn scenario_10_missing_upstream_issue_is_deleted() {
    let store = store_with(vec![tracked(10, "Vanished"), tracked(11, "Still here")]).await;
    let tracker = Arc::new(InMemoryTracker::with_issues([upstream(11, "Still here")]));

    let report = RunSyncPassHandler::new(tracker, store.clone(), UNTRIAGED_LABEL)
        .handle()
        .await
        .unwrap();

    assert_eq!(report.removed_closed, 1);
    assert_eq!(report.up_to_date, 1);
    assert!(store.get_by_url(&url(10)).await.unwrap().is_none());
    assert!(store.get_by_url(&url(11)).await.unwrap().is_some());
}

#[tokio::test]
async fn closed_and_triaged_issues_are_removed_unchanged_are_untouched() {
    let store = store_with(vec![
        tracked(1, "Closed"),
        tracked(2, "Triaged"),
        tracked(3, "Unchanged"),
    ])
    .await;
    let writes_after_seed = store.write_count();
    let tracker = Arc::new(InMemoryTracker::with_issues([
        upstream(1, "Closed").with_state(IssueState::Closed),
        UpstreamIssue::new(2, "Triaged", url(2)).with_label("area-dashboard"),
        upstream(3, "Unchanged"),
    ]));

    let report = RunSyncPassHandler::new(tracker, store.clone(), UNTRIAGED_LABEL)
        .handle()
        .await
        .unwrap();

    assert_eq!(report.removed_closed, 1);
    assert_eq!(report.removed_triaged, 1);
    assert_eq!(report.up_to_date, 1);
    assert_eq!(report.updated, 0);
    assert_eq!(store.write_count(), writes_after_seed + 2);
    let remaining: Vec<u64> = store.all().iter().map(|issue| issue.number).collect();
    assert_eq!(remaining, vec![3]);
}

#[tokio::test]
async fn label_order_alone_is_not_a_change() {
    let mut row = tracked(5, "Same");
    row.labels = vec!["bug".to_string(), UNTRIAGED_LABEL.to_string()];
    let store = store_with(vec![row]).await;
    let writes_after_seed = store.write_count();
    let tracker = Arc::new(InMemoryTracker::with_issues([upstream(5, "Same").with_label("bug")]));

    let report = RunSyncPassHandler::new(tracker, store.clone(), UNTRIAGED_LABEL)
        .handle()
        .await
        .unwrap();

    assert_eq!(report.up_to_date, 1);
    assert_eq!(store.write_count(), writes_after_seed);
}

#[tokio::test]
async fn paging_covers_every_tracked_issue() {
    let store = store_with((1..=7).map(|n| tracked(n, "Old")).collect()).await;
    let tracker = Arc::new(InMemoryTracker::with_issues((1..=7).map(|n| upstream(n, "New"))));

    let report = RunSyncPassHandler::new(tracker, store.clone(), UNTRIAGED_LABEL)
        .with_page_size(3)
        .handle()
        .await
        .unwrap();

    assert_eq!(report.updated, 7);
    assert!(store.all().iter().all(|issue| issue.title == "New"));
}

#[tokio::test]
async fn applied_decision_leaves_nothing_for_the_next_sync() {
    let store = store_with(vec![tracked(8, "Docs gap")]).await;
    let tracker = Arc::new(InMemoryTracker::with_issues([upstream(8, "Docs gap")]));

    ApplyTriageDecisionHandler::new(tracker.clone(), store.clone(), UNTRIAGED_LABEL)
        .handle(8, &TriageDecision::mark_triaged().with_label("area-docs"))
        .await
        .unwrap();
    let report = RunSyncPassHandler::new(tracker.clone(), store.clone(), UNTRIAGED_LABEL)
        .handle()
        .await
        .unwrap();

    assert!(store.is_empty());
    assert_eq!(report.removed(), 0);
    assert!(tracker.issue(8).unwrap().has_label("area-docs"));
    assert!(!tracker.issue(8).unwrap().has_label(UNTRIAGED_LABEL));
}
