//! In-memory issue store.
//!
//! Backs local runs and tests. URLs are unique: creating a record for a URL
//! that is already stored updates that row and keeps its id.
//!
//! # Panics
//!
//! Methods panic if the internal lock is poisoned.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::foundation::IssueId;
use crate::domain::issue::TrackedIssue;
use crate::ports::{IssueStore, Page, StoreError};

#[derive(Default)]
struct State {
    rows: BTreeMap<i64, TrackedIssue>,
    next_id: i64,
}

/// In-memory implementation of [`IssueStore`].
#[derive(Default)]
pub struct InMemoryIssueStore {
    state: RwLock<State>,
    failing_urls: RwLock<HashSet<String>>,
    writes: AtomicUsize,
}

impl InMemoryIssueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes create/update/delete fail for records with this URL.
    pub fn fail_writes_for(&self, url: impl Into<String>) {
        self.failing_urls
            .write()
            .expect("InMemoryIssueStore: failure lock poisoned")
            .insert(url.into());
    }

    /// Number of successful create/update/delete calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of every stored record in id order.
    pub fn all(&self) -> Vec<TrackedIssue> {
        self.read_state().rows.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read_state().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state
            .read()
            .expect("InMemoryIssueStore: state lock poisoned")
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state
            .write()
            .expect("InMemoryIssueStore: state lock poisoned")
    }

    fn check_failure(&self, url: &str) -> Result<(), StoreError> {
        let failing = self
            .failing_urls
            .read()
            .expect("InMemoryIssueStore: failure lock poisoned");
        if failing.contains(url) {
            return Err(StoreError::database(format!("injected failure for {url}")));
        }
        Ok(())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn find<'a>(state: &'a State, predicate: impl Fn(&TrackedIssue) -> bool) -> Option<&'a TrackedIssue> {
    state.rows.values().find(|issue| predicate(issue))
}

#[async_trait]
impl IssueStore for InMemoryIssueStore {
    async fn list(&self, page: u32, page_size: u32) -> Result<Page<TrackedIssue>, StoreError> {
        StoreError::check_page(page, page_size)?;
        let state = self.read_state();
        let skip = (page as usize - 1).saturating_mul(page_size as usize);
        let items = state
            .rows
            .values()
            .skip(skip)
            .take(page_size as usize)
            .cloned()
            .collect();
        Ok(Page::new(items, state.rows.len() as u64, page, page_size))
    }

    async fn get(&self, id: IssueId) -> Result<Option<TrackedIssue>, StoreError> {
        Ok(self.read_state().rows.get(&id.as_i64()).cloned())
    }

    async fn get_by_url(&self, url: &str) -> Result<Option<TrackedIssue>, StoreError> {
        Ok(find(&self.read_state(), |issue| issue.url == url).cloned())
    }

    async fn get_by_number(&self, number: u64) -> Result<Option<TrackedIssue>, StoreError> {
        Ok(find(&self.read_state(), |issue| issue.number == number).cloned())
    }

    async fn create(&self, issue: &TrackedIssue) -> Result<TrackedIssue, StoreError> {
        self.check_failure(&issue.url)?;
        let mut state = self.write_state();

        let existing = find(&state, |row| row.url == issue.url).and_then(|row| row.id);
        let id = match existing {
            Some(id) => id,
            None => {
                state.next_id += 1;
                IssueId::new(state.next_id).map_err(|e| StoreError::database(e.to_string()))?
            }
        };

        let stored = issue.clone().with_id(id);
        state.rows.insert(id.as_i64(), stored.clone());
        drop(state);
        self.record_write();
        Ok(stored)
    }

    async fn update(&self, id: IssueId, issue: &TrackedIssue) -> Result<(), StoreError> {
        self.check_failure(&issue.url)?;
        let mut state = self.write_state();
        if !state.rows.contains_key(&id.as_i64()) {
            return Err(StoreError::NotFound(id));
        }
        let url_taken = find(&state, |row| row.url == issue.url && row.id != Some(id)).is_some();
        if url_taken {
            return Err(StoreError::Conflict { id });
        }

        state.rows.insert(id.as_i64(), issue.clone().with_id(id));
        drop(state);
        self.record_write();
        Ok(())
    }

    async fn delete(&self, id: IssueId) -> Result<(), StoreError> {
        let url = self
            .read_state()
            .rows
            .get(&id.as_i64())
            .map(|row| row.url.clone())
            .ok_or(StoreError::NotFound(id))?;
        self.check_failure(&url)?;

        self.write_state()
            .rows
            .remove(&id.as_i64())
            .ok_or(StoreError::NotFound(id))?;
        self.record_write();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(number: u64) -> TrackedIssue {
        TrackedIssue {
            title: format!("Issue {number}"),
            url: format!("https://github.com/o/r/issues/{number}"),
            number,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let store = InMemoryIssueStore::new();

        let first = store.create(&issue(1)).await.unwrap();
        let second = store.create(&issue(2)).await.unwrap();

        assert_eq!(first.id.unwrap().as_i64(), 1);
        assert_eq!(second.id.unwrap().as_i64(), 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn create_with_known_url_updates_in_place() {
        let store = InMemoryIssueStore::new();
        let first = store.create(&issue(1)).await.unwrap();

        let mut again = issue(1);
        again.title = "Renamed".to_string();
        let second = store.create(&again).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.len(), 1);
        assert_eq!(store.all()[0].title, "Renamed");
    }

    #[tokio::test]
    async fn create_ignores_incoming_id() {
        let store = InMemoryIssueStore::new();
        let input = issue(1).with_id(IssueId::new(99).unwrap());

        let created = store.create(&input).await.unwrap();

        assert_eq!(created.id.unwrap().as_i64(), 1);
    }

    #[tokio::test]
    async fn lookups_return_none_when_absent() {
        let store = InMemoryIssueStore::new();
        store.create(&issue(5)).await.unwrap();

        assert!(store.get(IssueId::new(2).unwrap()).await.unwrap().is_none());
        assert!(store.get_by_url("nope").await.unwrap().is_none());
        assert!(store.get_by_number(6).await.unwrap().is_none());
        assert_eq!(store.get_by_number(5).await.unwrap().unwrap().number, 5);
        assert!(store
            .get_by_url("https://github.com/o/r/issues/5")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn paging_is_one_based_with_true_total() {
        let store = InMemoryIssueStore::new();
        for n in 1..=5 {
            store.create(&issue(n)).await.unwrap();
        }

        let page = store.list(2, 2).await.unwrap();
        assert_eq!(page.total_count, 5);
        let numbers: Vec<u64> = page.items.iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![3, 4]);

        let past_end = store.list(9, 2).await.unwrap();
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total_count, 5);

        assert!(matches!(
            store.list(0, 2).await,
            Err(StoreError::InvalidPage { .. })
        ));
    }

    #[tokio::test]
    async fn list_all_urls_reads_every_page() {
        let store = InMemoryIssueStore::new();
        for n in 1..=12 {
            store.create(&issue(n)).await.unwrap();
        }

        let all = store.list_all(5).await.unwrap();
        let urls = store.list_all_urls().await.unwrap();

        assert_eq!(all.len(), 12);
        assert_eq!(urls.len(), 12);
        assert!(urls.contains("https://github.com/o/r/issues/12"));
    }

    #[tokio::test]
    async fn list_all_on_empty_store() {
        let store = InMemoryIssueStore::new();
        assert!(store.list_all(10).await.unwrap().is_empty());
        assert!(store.list_all_urls().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty_with_true_total() {
        let store = InMemoryIssueStore::new();

        let empty = store.list(3, 10).await.unwrap();
        assert!(empty.items.is_empty());
        assert_eq!(empty.total_count, 0);

        for n in 1..=4 {
            store.create(&issue(n)).await.unwrap();
        }
        let past_end = store.list(3, 10).await.unwrap();
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total_count, 4);
        assert_eq!(past_end.page, 3);
        assert!(!past_end.has_more());
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let store = InMemoryIssueStore::new();
        let id = IssueId::new(1).unwrap();

        assert!(matches!(
            store.update(id, &issue(1)).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(store.delete(id).await, Err(StoreError::NotFound(_))));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn update_rejects_url_owned_by_another_row() {
        let store = InMemoryIssueStore::new();
        store.create(&issue(1)).await.unwrap();
        let second = store.create(&issue(2)).await.unwrap();

        let result = store.update(second.id.unwrap(), &issue(1)).await;

        assert!(matches!(result, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn injected_failures_block_writes() {
        let store = InMemoryIssueStore::new();
        let created = store.create(&issue(1)).await.unwrap();
        store.fail_writes_for(created.url.clone());

        assert!(store.delete(created.id.unwrap()).await.is_err());
        assert_eq!(store.len(), 1);
        assert_eq!(store.write_count(), 1);
    }
}
