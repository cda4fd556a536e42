//! Issue store port.
//!
//! Persistence contract for tracked issues. Implementations live in
//! `adapters::store` (in-memory, PostgreSQL, and the issues REST API).
//!
//! # Design
//!
//! - **Lookups return `Option`**: absence is not an error
//! - **1-based paging**: `list(1, n)` is the first page
//! - **URL is the natural key**: creating a record whose URL already exists
//!   updates that row instead of adding a second one

use std::collections::HashSet;

use async_trait::async_trait;

use crate::domain::foundation::IssueId;
use crate::domain::issue::TrackedIssue;

/// Page size used when collecting every tracked URL.
pub const DEFAULT_LIST_ALL_PAGE_SIZE: u32 = 500;

/// One page of results plus the total number of records in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: u64, page: u32, page_size: u32) -> Self {
        Self {
            items,
            total_count,
            page,
            page_size,
        }
    }

    /// Number of pages needed to cover `total_count`.
    pub fn total_pages(&self) -> u32 {
        if self.page_size == 0 {
            return 0;
        }
        let pages = self.total_count.div_ceil(u64::from(self.page_size));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Returns true if a later page may hold more items.
    pub fn has_more(&self) -> bool {
        !self.items.is_empty() && self.page < self.total_pages()
    }
}

/// Repository port for tracked issues.
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Lists one page of tracked issues ordered by id.
    ///
    /// # Errors
    ///
    /// - `InvalidPage` if `page` or `page_size` is zero
    async fn list(&self, page: u32, page_size: u32) -> Result<Page<TrackedIssue>, StoreError>;

    /// Finds a tracked issue by store id.
    async fn get(&self, id: IssueId) -> Result<Option<TrackedIssue>, StoreError>;

    /// Finds a tracked issue by upstream URL.
    async fn get_by_url(&self, url: &str) -> Result<Option<TrackedIssue>, StoreError>;

    /// Finds a tracked issue by upstream issue number.
    async fn get_by_number(&self, number: u64) -> Result<Option<TrackedIssue>, StoreError>;

    /// Persists a new record and returns it with its assigned id.
    ///
    /// Any id on the input is ignored.
    async fn create(&self, issue: &TrackedIssue) -> Result<TrackedIssue, StoreError>;

    /// Replaces the record with the given id.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no record has this id
    /// - `Conflict` if the store rejected the write as stale or inconsistent
    async fn update(&self, id: IssueId, issue: &TrackedIssue) -> Result<(), StoreError>;

    /// Deletes the record with the given id.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no record has this id
    async fn delete(&self, id: IssueId) -> Result<(), StoreError>;

    /// Reads every tracked issue, paging until the store is exhausted.
    async fn list_all(&self, page_size: u32) -> Result<Vec<TrackedIssue>, StoreError> {
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            let result = self.list(page, page_size).await?;
            let more = result.has_more();
            all.extend(result.items);
            if !more {
                return Ok(all);
            }
            page += 1;
        }
    }

    /// Collects the URL of every tracked issue.
    async fn list_all_urls(&self) -> Result<HashSet<String>, StoreError> {
        let issues = self.list_all(DEFAULT_LIST_ALL_PAGE_SIZE).await?;
        Ok(issues.into_iter().map(|issue| issue.url).collect())
    }
}

/// Issue store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("tracked issue {0} not found")]
    NotFound(IssueId),

    #[error("conflicting write for tracked issue {id}")]
    Conflict { id: IssueId },

    #[error("invalid page {page} with page size {page_size}")]
    InvalidPage { page: u32, page_size: u32 },

    #[error("database error: {0}")]
    Database(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Validates 1-based paging arguments.
    pub fn check_page(page: u32, page_size: u32) -> Result<(), StoreError> {
        if page == 0 || page_size == 0 {
            return Err(StoreError::InvalidPage { page, page_size });
        }
        Ok(())
    }
}
