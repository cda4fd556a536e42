//! Issue store backed by the issues REST API.
//!
//! Routes (relative to the configured base URL):
//!
//! | Operation | Request |
//! |-----------|---------|
//! | list | `GET /api/Issues?page=&pageSize=` (total in `X-Total-Count`) |
//! | get | `GET /api/Issues/{id}` |
//! | get_by_url | `GET /api/Issues/by-url?url=` |
//! | get_by_number | `GET /api/Issues/by-issue-number?issueNumber=` |
//! | create | `POST /api/Issues` |
//! | update | `PUT /api/Issues/{id}` |
//! | delete | `DELETE /api/Issues/{id}` |
//!
//! 404 means absent (or `NotFound` for writes) and 409 means `Conflict`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;

use crate::adapters::retry::{
    is_retryable_status, is_retryable_transport_error, parse_retry_after, retry_delay,
    truncate_for_error,
};
use crate::domain::foundation::IssueId;
use crate::domain::issue::TrackedIssue;
use crate::ports::{IssueStore, Page, StoreError};

const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Connection settings for the issues API.
#[derive(Debug, Clone)]
pub struct IssuesApiConfig {
    pub base_url: String,
    token: Option<Secret<String>>,
    pub request_timeout: Duration,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

impl IssuesApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            request_timeout: Duration::from_secs(30),
            retry_max_attempts: 3,
            retry_base_delay_ms: 500,
        }
    }

    pub fn with_token(mut self, token: Secret<String>) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, max_attempts: usize, base_delay_ms: u64) -> Self {
        self.retry_max_attempts = max_attempts;
        self.retry_base_delay_ms = base_delay_ms;
        self
    }
}

/// REST client implementing [`IssueStore`].
#[derive(Clone)]
pub struct IssuesApiStore {
    http: reqwest::Client,
    base_url: String,
    token: Option<Secret<String>>,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl IssuesApiStore {
    pub fn new(config: IssuesApiConfig) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StoreError::transport(format!("failed to create api client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
            retry_max_attempts: config.retry_max_attempts.max(1),
            retry_base_delay_ms: config.retry_base_delay_ms.max(1),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/Issues{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Sends a request, retrying transient failures.
    ///
    /// Non-success statuses other than retryable ones are returned as-is so
    /// each operation can interpret 404 and 409 itself.
    async fn send<F>(&self, operation: &str, mut request_builder: F) -> Result<Response, StoreError>
    where
        F: FnMut() -> RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            match self.authorized(request_builder()).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if attempt < self.retry_max_attempts && is_retryable_status(status) {
                        let retry_after = parse_retry_after(response.headers());
                        tracing::debug!(operation, attempt, status, "issues api request failed, retrying");
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }
                    return Ok(response);
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(StoreError::transport(format!(
                        "issues api {operation} request failed: {error}"
                    )));
                }
            }
        }
    }

    async fn get_optional(
        &self,
        operation: &str,
        request_builder: impl FnMut() -> RequestBuilder,
    ) -> Result<Option<TrackedIssue>, StoreError> {
        let response = self.send(operation, request_builder).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = expect_success(operation, response).await?;
        decode(operation, response).await.map(Some)
    }
}

async fn expect_success(operation: &str, response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::transport(format!(
        "issues api {operation} failed with status {}: {}",
        status.as_u16(),
        truncate_for_error(&body, 800)
    )))
}

async fn decode<T: DeserializeOwned>(operation: &str, response: Response) -> Result<T, StoreError> {
    response
        .json::<T>()
        .await
        .map_err(|e| StoreError::Serialization(format!("failed to decode {operation}: {e}")))
}

/// Maps write statuses that carry meaning before the generic failure path.
fn write_status(id: IssueId, status: StatusCode) -> Option<StoreError> {
    match status {
        StatusCode::NOT_FOUND => Some(StoreError::NotFound(id)),
        StatusCode::CONFLICT => Some(StoreError::Conflict { id }),
        _ => None,
    }
}

#[async_trait]
impl IssueStore for IssuesApiStore {
    async fn list(&self, page: u32, page_size: u32) -> Result<Page<TrackedIssue>, StoreError> {
        StoreError::check_page(page, page_size)?;
        let url = self.url("");
        let query = [("page", page.to_string()), ("pageSize", page_size.to_string())];

        let response = self
            .send("list issues", || self.http.get(&url).query(&query))
            .await?;
        // The API answers 400 for any page beyond the last one, including
        // page 1 of an empty table. Arguments were already checked above.
        if response.status() == StatusCode::BAD_REQUEST {
            if page == 1 {
                return Ok(Page::new(Vec::new(), 0, page, page_size));
            }
            let first = self.list(1, page_size).await?;
            return Ok(Page::new(Vec::new(), first.total_count, page, page_size));
        }
        let response = expect_success("list issues", response).await?;

        let total_header = response
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let items: Vec<TrackedIssue> = decode("list issues", response).await?;
        let total_count = total_header.unwrap_or_else(|| {
            u64::from(page - 1) * u64::from(page_size) + items.len() as u64
        });

        Ok(Page::new(items, total_count, page, page_size))
    }

    async fn get(&self, id: IssueId) -> Result<Option<TrackedIssue>, StoreError> {
        let url = self.url(&format!("/{id}"));
        self.get_optional("get issue", || self.http.get(&url)).await
    }

    async fn get_by_url(&self, issue_url: &str) -> Result<Option<TrackedIssue>, StoreError> {
        let url = self.url("/by-url");
        self.get_optional("get issue by url", || {
            self.http.get(&url).query(&[("url", issue_url)])
        })
        .await
    }

    async fn get_by_number(&self, number: u64) -> Result<Option<TrackedIssue>, StoreError> {
        let url = self.url("/by-issue-number");
        let number = number.to_string();
        self.get_optional("get issue by number", || {
            self.http.get(&url).query(&[("issueNumber", number.as_str())])
        })
        .await
    }

    async fn create(&self, issue: &TrackedIssue) -> Result<TrackedIssue, StoreError> {
        let url = self.url("");
        let mut payload = issue.clone();
        payload.id = None;

        let response = self
            .send("create issue", || self.http.post(&url).json(&payload))
            .await?;
        let response = expect_success("create issue", response).await?;
        let created: TrackedIssue = decode("create issue", response).await?;
        if created.id.is_none() {
            return Err(StoreError::Serialization(
                "create issue response carried no id".to_string(),
            ));
        }
        Ok(created)
    }

    async fn update(&self, id: IssueId, issue: &TrackedIssue) -> Result<(), StoreError> {
        let url = self.url(&format!("/{id}"));
        let payload = issue.clone().with_id(id);

        let response = self
            .send("update issue", || self.http.put(&url).json(&payload))
            .await?;
        if let Some(err) = write_status(id, response.status()) {
            return Err(err);
        }
        expect_success("update issue", response).await?;
        Ok(())
    }

    async fn delete(&self, id: IssueId) -> Result<(), StoreError> {
        let url = self.url(&format!("/{id}"));

        let response = self
            .send("delete issue", || self.http.delete(&url))
            .await?;
        if let Some(err) = write_status(id, response.status()) {
            return Err(err);
        }
        expect_success("delete issue", response).await?;
        Ok(())
    }
}
