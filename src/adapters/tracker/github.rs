//! GitHub REST implementation of the [`IssueTracker`] port.
//!
//! Lists are paged 100 at a time until a short page. Requests that fail with
//! 429, a 5xx status or a transport error are retried with exponential backoff,
//! honoring `Retry-After` when GitHub sends it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{RequestBuilder, Response};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::github_wire::{GithubComment, GithubIssue};
use crate::adapters::retry::{
    is_retryable_status, is_retryable_transport_error, parse_retry_after, retry_delay,
    truncate_for_error,
};
use crate::domain::issue::{IssueComment, UpstreamIssue};
use crate::ports::{IssueTracker, TrackerError};

const PAGE_SIZE: usize = 100;
const API_VERSION: &str = "2022-11-28";

/// Connection settings for one watched repository.
#[derive(Debug, Clone)]
pub struct GithubTrackerConfig {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    token: Secret<String>,
    pub request_timeout: Duration,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

impl GithubTrackerConfig {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, token: Secret<String>) -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            owner: owner.into(),
            repo: repo.into(),
            token,
            request_timeout: Duration::from_secs(30),
            retry_max_attempts: 4,
            retry_base_delay_ms: 500,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
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

/// GitHub issue tracker client.
#[derive(Clone)]
pub struct GithubTracker {
    http: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl GithubTracker {
    pub fn new(config: GithubTrackerConfig) -> Result<Self, TrackerError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("triage-sync"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        let token = config.token.expose_secret().trim();
        if !token.is_empty() {
            let auth = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| TrackerError::AuthenticationFailed)?;
            headers.insert(AUTHORIZATION, auth);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TrackerError::Network(format!("failed to create github client: {e}")))?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            owner: config.owner,
            repo: config.repo,
            retry_max_attempts: config.retry_max_attempts.max(1),
            retry_base_delay_ms: config.retry_base_delay_ms.max(1),
        })
    }

    fn issues_url(&self) -> String {
        format!("{}/repos/{}/{}/issues", self.api_base, self.owner, self.repo)
    }

    fn issue_url(&self, number: u64) -> String {
        format!("{}/{}", self.issues_url(), number)
    }

    /// Sends a request, retrying transient failures.
    ///
    /// Returns the successful response, or maps the final failure into a
    /// [`TrackerError`]. `number` names the issue in `NotFound` errors.
    async fn send<F>(
        &self,
        operation: &str,
        number: Option<u64>,
        mut request_builder: F,
    ) -> Result<Response, TrackerError>
    where
        F: FnMut() -> RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            match request_builder().send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts && is_retryable_status(status.as_u16()) {
                        tracing::debug!(
                            operation,
                            attempt,
                            status = status.as_u16(),
                            "github request failed, retrying"
                        );
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }

                    return Err(match (status.as_u16(), number) {
                        (401, _) => TrackerError::AuthenticationFailed,
                        (404, Some(number)) => TrackerError::NotFound(number),
                        (429, _) => TrackerError::RateLimited {
                            retry_after_secs: retry_after.map(|d| d.as_secs()).unwrap_or(60),
                        },
                        (code, _) => TrackerError::api(
                            code,
                            format!("{operation}: {}", truncate_for_error(&body, 800)),
                        ),
                    });
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(TrackerError::Network(format!(
                        "github {operation} request failed: {error}"
                    )));
                }
            }
        }
    }

    async fn request_json<T, F>(
        &self,
        operation: &str,
        number: Option<u64>,
        request_builder: F,
    ) -> Result<T, TrackerError>
    where
        T: DeserializeOwned,
        F: FnMut() -> RequestBuilder,
    {
        self.send(operation, number, request_builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| TrackerError::Parse(format!("failed to decode github {operation}: {e}")))
    }

    /// Collects every page of a list endpoint.
    async fn list_pages<T, F>(&self, operation: &str, mut page_request: F) -> Result<Vec<T>, TrackerError>
    where
        T: DeserializeOwned,
        F: FnMut(&str) -> RequestBuilder,
    {
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let page_value = page.to_string();
            let chunk: Vec<T> = self
                .request_json(operation, None, || page_request(&page_value))
                .await?;
            let chunk_len = chunk.len();
            rows.extend(chunk);
            if chunk_len < PAGE_SIZE {
                return Ok(rows);
            }
            page = page.saturating_add(1);
        }
    }
}

#[async_trait]
impl IssueTracker for GithubTracker {
    async fn list_open_issues(
        &self,
        label_filter: Option<&str>,
    ) -> Result<Vec<UpstreamIssue>, TrackerError> {
        let url = self.issues_url();
        let per_page = PAGE_SIZE.to_string();
        let issues: Vec<GithubIssue> = self
            .list_pages("list issues", |page| {
                let mut request = self.http.get(&url).query(&[
                    ("state", "open"),
                    ("per_page", per_page.as_str()),
                    ("page", page),
                ]);
                if let Some(label) = label_filter {
                    request = request.query(&[("labels", label)]);
                }
                request
            })
            .await?;

        Ok(issues
            .into_iter()
            .filter(|issue| !issue.is_pull_request())
            .map(UpstreamIssue::from)
            .collect())
    }

    async fn get_issue(&self, number: u64) -> Result<UpstreamIssue, TrackerError> {
        let url = self.issue_url(number);
        let issue: GithubIssue = self
            .request_json("get issue", Some(number), || self.http.get(&url))
            .await?;
        if issue.is_pull_request() {
            return Err(TrackerError::NotFound(number));
        }
        Ok(issue.into())
    }

    async fn get_comments(&self, number: u64) -> Result<Vec<IssueComment>, TrackerError> {
        let url = format!("{}/comments", self.issue_url(number));
        let per_page = PAGE_SIZE.to_string();
        let comments: Vec<GithubComment> = self
            .list_pages("list issue comments", |page| {
                self.http
                    .get(&url)
                    .query(&[("per_page", per_page.as_str()), ("page", page)])
            })
            .await?;
        Ok(comments.into_iter().map(IssueComment::from).collect())
    }

    async fn add_label(&self, number: u64, label: &str) -> Result<(), TrackerError> {
        let url = format!("{}/labels", self.issue_url(number));
        let payload = json!({ "labels": [label] });
        self.send("add label", Some(number), || self.http.post(&url).json(&payload))
            .await?;
        Ok(())
    }

    async fn remove_label(&self, number: u64, label: &str) -> Result<(), TrackerError> {
        let url = format!("{}/labels/{}", self.issue_url(number), label);
        match self
            .send("remove label", Some(number), || self.http.delete(&url))
            .await
        {
            Ok(_) | Err(TrackerError::NotFound(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn add_comment(&self, number: u64, body: &str) -> Result<(), TrackerError> {
        let url = format!("{}/comments", self.issue_url(number));
        let payload = json!({ "body": body });
        self.send("add comment", Some(number), || self.http.post(&url).json(&payload))
            .await?;
        Ok(())
    }

    async fn assign_milestone(&self, number: u64, milestone: u64) -> Result<(), TrackerError> {
        let url = self.issue_url(number);
        let payload = json!({ "milestone": milestone });
        self.send("assign milestone", Some(number), || {
            self.http.patch(&url).json(&payload)
        })
        .await?;
        Ok(())
    }

    async fn close_issue(&self, number: u64) -> Result<(), TrackerError> {
        let url = self.issue_url(number);
        let payload = json!({ "state": "closed" });
        self.send("close issue", Some(number), || self.http.patch(&url).json(&payload))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::Value;

    fn tracker(server: &MockServer) -> GithubTracker {
        GithubTracker::new(
            GithubTrackerConfig::new("o", "r", Secret::new("gh-token".to_string()))
                .with_api_base(server.base_url())
                .with_retry(3, 1),
        )
        .unwrap()
    }

    fn issue_json(number: u64, labels: &[&str]) -> Value {
        json!({
            "number": number,
            "title": format!("Issue {number}"),
            "html_url": format!("https://github.com/o/r/issues/{number}"),
            "state": "open",
            "labels": labels.iter().map(|l| json!({ "name": l })).collect::<Vec<_>>(),
            "comments": 0,
            "reactions": { "+1": 1 }
        })
    }

    #[tokio::test]
    async fn lists_untriaged_issues_and_skips_pull_requests() {
        let server = MockServer::start();
        let mut pr = issue_json(3, &["untriaged"]);
        pr["pull_request"] = json!({ "url": "x" });
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/repos/o/r/issues")
                .query_param("state", "open")
                .query_param("labels", "untriaged")
                .query_param("page", "1")
                .header("authorization", "Bearer gh-token")
                .header("x-github-api-version", API_VERSION);
            then.status(200).json_body(json!([
                issue_json(1, &["untriaged"]),
                pr,
                issue_json(2, &["bug", "untriaged"])
            ]));
        });

        let issues = tracker(&server)
            .list_open_issues(Some("untriaged"))
            .await
            .unwrap();

        mock.assert();
        let numbers: Vec<u64> = issues.iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(issues[1].labels, vec!["bug", "untriaged"]);
    }

    #[tokio::test]
    async fn pages_until_short_page() {
        let server = MockServer::start();
        let full: Vec<Value> = (1..=100).map(|n| issue_json(n, &[])).collect();
        let first = server.mock(|when, then| {
            when.method(GET).path("/repos/o/r/issues").query_param("page", "1");
            then.status(200).json_body(Value::Array(full));
        });
        let second = server.mock(|when, then| {
            when.method(GET).path("/repos/o/r/issues").query_param("page", "2");
            then.status(200).json_body(json!([issue_json(101, &[])]));
        });

        let issues = tracker(&server).list_open_issues(None).await.unwrap();

        first.assert();
        second.assert();
        assert_eq!(issues.len(), 101);
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/repos/o/r/issues/9");
            then.status(502).body("bad gateway");
        });

        let err = tracker(&server).get_issue(9).await.unwrap_err();

        mock.assert_hits(3);
        assert!(matches!(err, TrackerError::Api { status: 502, .. }));
    }

    #[tokio::test]
    async fn missing_issue_is_not_found() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/repos/o/r/issues/404");
            then.status(404).json_body(json!({ "message": "Not Found" }));
        });

        let err = tracker(&server).get_issue(404).await.unwrap_err();

        mock.assert_hits(1);
        assert!(matches!(err, TrackerError::NotFound(404)));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_authentication_failed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/o/r/issues");
            then.status(401).body("Bad credentials");
        });

        let err = tracker(&server).list_open_issues(None).await.unwrap_err();

        assert!(matches!(err, TrackerError::AuthenticationFailed));
    }

    #[tokio::test]
    async fn comments_keep_author_and_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/o/r/issues/5/comments");
            then.status(200).json_body(json!([
                { "user": { "login": "alice" }, "body": "Repro attached" },
                { "user": { "login": "bob" }, "body": "Same here" }
            ]));
        });

        let comments = tracker(&server).get_comments(5).await.unwrap();

        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0], IssueComment::new("alice", "Repro attached"));
    }

    #[tokio::test]
    async fn mutations_hit_expected_endpoints() {
        let server = MockServer::start();
        let add_label = server.mock(|when, then| {
            when.method(POST)
                .path("/repos/o/r/issues/7/labels")
                .json_body(json!({ "labels": ["area-docs"] }));
            then.status(200).json_body(json!([]));
        });
        let remove_label = server.mock(|when, then| {
            when.method(DELETE).path("/repos/o/r/issues/7/labels/untriaged");
            then.status(404);
        });
        let comment = server.mock(|when, then| {
            when.method(POST)
                .path("/repos/o/r/issues/7/comments")
                .json_body(json!({ "body": "Thanks" }));
            then.status(201).json_body(json!({ "id": 1 }));
        });
        let milestone = server.mock(|when, then| {
            when.method(PATCH)
                .path("/repos/o/r/issues/7")
                .json_body(json!({ "milestone": 12 }));
            then.status(200).json_body(json!({}));
        });
        let close = server.mock(|when, then| {
            when.method(PATCH)
                .path("/repos/o/r/issues/7")
                .json_body(json!({ "state": "closed" }));
            then.status(200).json_body(json!({}));
        });

        let tracker = tracker(&server);
        tracker.add_label(7, "area-docs").await.unwrap();
        tracker.remove_label(7, "untriaged").await.unwrap();
        tracker.add_comment(7, "Thanks").await.unwrap();
        tracker.assign_milestone(7, 12).await.unwrap();
        tracker.close_issue(7).await.unwrap();

        add_label.assert();
        remove_label.assert();
        comment.assert();
        milestone.assert();
        close.assert();
    }
}
