//! PostgreSQL implementation of IssueStore.
//!
//! Persists tracked issues to the `tracked_issues` table. `url` carries a
//! unique constraint; `create` upserts on it.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::domain::foundation::IssueId;
use crate::domain::issue::TrackedIssue;
use crate::ports::{IssueStore, Page, StoreError};

/// Table definition applied by [`PostgresIssueStore::ensure_schema`].
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tracked_issues (
    id BIGSERIAL PRIMARY KEY,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    number BIGINT NOT NULL,
    milestone TEXT,
    labels TEXT[] NOT NULL DEFAULT '{}',
    upvotes INTEGER NOT NULL DEFAULT 0,
    is_how_to_question BOOLEAN NOT NULL DEFAULT FALSE,
    is_likely_a_bug BOOLEAN NOT NULL DEFAULT FALSE,
    is_likely_a_feature_request BOOLEAN NOT NULL DEFAULT FALSE,
    is_triaged BOOLEAN NOT NULL DEFAULT FALSE,
    summary TEXT,
    reasoning TEXT
)
"#;

const COLUMNS: &str = "id, url, title, number, milestone, labels, upvotes, \
     is_how_to_question, is_likely_a_bug, is_likely_a_feature_request, is_triaged, \
     summary, reasoning";

/// Postgres error code for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL implementation of IssueStore.
#[derive(Clone)]
pub struct PostgresIssueStore {
    pool: PgPool,
}

impl PostgresIssueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `tracked_issues` table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to create schema: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl IssueStore for PostgresIssueStore {
    async fn list(&self, page: u32, page_size: u32) -> Result<Page<TrackedIssue>, StoreError> {
        StoreError::check_page(page, page_size)?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tracked_issues")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to count tracked issues: {}", e)))?;

        let sql = format!("SELECT {COLUMNS} FROM tracked_issues ORDER BY id LIMIT $1 OFFSET $2");
        let rows = sqlx::query(&sql)
            .bind(i64::from(page_size))
            .bind(page_offset(page, page_size))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to list tracked issues: {}", e)))?;

        let items = rows
            .into_iter()
            .map(row_to_issue)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, total.max(0) as u64, page, page_size))
    }

    async fn get(&self, id: IssueId) -> Result<Option<TrackedIssue>, StoreError> {
        let sql = select_where("id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(fetch_error)?;

        row.map(row_to_issue).transpose()
    }

    async fn get_by_url(&self, url: &str) -> Result<Option<TrackedIssue>, StoreError> {
        let sql = select_where("url = $1");
        let row = sqlx::query(&sql)
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(fetch_error)?;

        row.map(row_to_issue).transpose()
    }

    async fn get_by_number(&self, number: u64) -> Result<Option<TrackedIssue>, StoreError> {
        let sql = select_where("number = $1");
        let row = sqlx::query(&sql)
            .bind(to_db_number(number)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(fetch_error)?;

        row.map(row_to_issue).transpose()
    }

    async fn create(&self, issue: &TrackedIssue) -> Result<TrackedIssue, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO tracked_issues (
                url, title, number, milestone, labels, upvotes,
                is_how_to_question, is_likely_a_bug, is_likely_a_feature_request, is_triaged,
                summary, reasoning
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (url) DO UPDATE SET
                title = EXCLUDED.title,
                number = EXCLUDED.number,
                milestone = EXCLUDED.milestone,
                labels = EXCLUDED.labels,
                upvotes = EXCLUDED.upvotes,
                is_how_to_question = EXCLUDED.is_how_to_question,
                is_likely_a_bug = EXCLUDED.is_likely_a_bug,
                is_likely_a_feature_request = EXCLUDED.is_likely_a_feature_request,
                is_triaged = EXCLUDED.is_triaged,
                summary = EXCLUDED.summary,
                reasoning = EXCLUDED.reasoning
            RETURNING {COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(&issue.url)
            .bind(&issue.title)
            .bind(to_db_number(issue.number)?)
            .bind(&issue.milestone)
            .bind(&issue.labels)
            .bind(to_db_upvotes(issue.upvotes))
            .bind(issue.is_how_to_question)
            .bind(issue.is_likely_a_bug)
            .bind(issue.is_likely_a_feature_request)
            .bind(issue.is_triaged)
            .bind(&issue.summary)
            .bind(&issue.reasoning)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to insert tracked issue: {}", e)))?;

        row_to_issue(row)
    }

    async fn update(&self, id: IssueId, issue: &TrackedIssue) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE tracked_issues SET
                url = $2,
                title = $3,
                number = $4,
                milestone = $5,
                labels = $6,
                upvotes = $7,
                is_how_to_question = $8,
                is_likely_a_bug = $9,
                is_likely_a_feature_request = $10,
                is_triaged = $11,
                summary = $12,
                reasoning = $13
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .bind(&issue.url)
        .bind(&issue.title)
        .bind(to_db_number(issue.number)?)
        .bind(&issue.milestone)
        .bind(&issue.labels)
        .bind(to_db_upvotes(issue.upvotes))
        .bind(issue.is_how_to_question)
        .bind(issue.is_likely_a_bug)
        .bind(issue.is_likely_a_feature_request)
        .bind(issue.is_triaged)
        .bind(&issue.summary)
        .bind(&issue.reasoning)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::Conflict { id }
            }
            _ => StoreError::database(format!("Failed to update tracked issue: {}", e)),
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(())
    }

    async fn delete(&self, id: IssueId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM tracked_issues WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to delete tracked issue: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(())
    }
}

fn select_where(clause: &str) -> String {
    format!("SELECT {COLUMNS} FROM tracked_issues WHERE {clause} ORDER BY id LIMIT 1")
}

fn fetch_error(e: sqlx::Error) -> StoreError {
    StoreError::database(format!("Failed to fetch tracked issue: {}", e))
}

fn page_offset(page: u32, page_size: u32) -> i64 {
    i64::from(page.saturating_sub(1)) * i64::from(page_size)
}

fn to_db_number(number: u64) -> Result<i64, StoreError> {
    i64::try_from(number)
        .map_err(|_| StoreError::Serialization(format!("issue number {number} out of range")))
}

fn to_db_upvotes(upvotes: u32) -> i32 {
    i32::try_from(upvotes).unwrap_or(i32::MAX)
}

fn row_to_issue(row: PgRow) -> Result<TrackedIssue, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Serialization(format!("Invalid tracked issue row: {}", e));

    let id: i64 = row.try_get("id").map_err(decode)?;
    let number: i64 = row.try_get("number").map_err(decode)?;
    let upvotes: i32 = row.try_get("upvotes").map_err(decode)?;

    Ok(TrackedIssue {
        id: Some(IssueId::new(id).map_err(|e| StoreError::Serialization(e.to_string()))?),
        url: row.try_get("url").map_err(decode)?,
        title: row.try_get("title").map_err(decode)?,
        number: u64::try_from(number).unwrap_or_default(),
        milestone: row.try_get("milestone").map_err(decode)?,
        labels: row.try_get("labels").map_err(decode)?,
        upvotes: u32::try_from(upvotes).unwrap_or_default(),
        is_how_to_question: row.try_get("is_how_to_question").map_err(decode)?,
        is_likely_a_bug: row.try_get("is_likely_a_bug").map_err(decode)?,
        is_likely_a_feature_request: row.try_get("is_likely_a_feature_request").map_err(decode)?,
        is_triaged: row.try_get("is_triaged").map_err(decode)?,
        summary: row.try_get("summary").map_err(decode)?,
        reasoning: row.try_get("reasoning").map_err(decode)?,
    })
}
