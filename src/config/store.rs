//! Issue store configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Which [`IssueStore`](crate::ports::IssueStore) adapter backs the passes.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local; contents are lost on restart
    #[default]
    Memory,
    /// `tracked_issues` table in PostgreSQL
    Postgres,
    /// The issue service REST API
    IssuesApi,
}

/// Store selection plus the settings of the chosen backend
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Required when `backend = postgres`
    pub database: Option<DatabaseConfig>,

    /// Required when `backend = issues_api`
    pub api: Option<IssuesApiSettings>,
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.backend {
            StoreBackend::Memory => Ok(()),
            StoreBackend::Postgres => self
                .database
                .as_ref()
                .ok_or(ValidationError::MissingRequired("STORE__DATABASE__URL"))?
                .validate(),
            StoreBackend::IssuesApi => self
                .api
                .as_ref()
                .ok_or(ValidationError::MissingRequired("STORE__API__BASE_URL"))?
                .validate(),
        }
    }
}

/// PostgreSQL pool settings
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Create the tracked issues table on startup if it is missing
    #[serde(default = "default_true")]
    pub ensure_schema: bool,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Builds a pool that connects on first use.
    pub fn connect_lazy(&self) -> Result<sqlx::PgPool, sqlx::Error> {
        sqlx::postgres::PgPoolOptions::new()
            .min_connections(self.min_connections)
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout())
            .connect_lazy(&self.url)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("STORE__DATABASE__URL"));
        }
        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(ValidationError::InvalidDatabaseUrl);
        }
        if self.min_connections > self.max_connections {
            return Err(ValidationError::InvalidPoolSize);
        }
        if self.max_connections > 100 {
            return Err(ValidationError::PoolSizeTooLarge);
        }
        Ok(())
    }
}

/// Issue service REST API settings
#[derive(Debug, Clone, Deserialize)]
pub struct IssuesApiSettings {
    /// Service root, e.g. `http://issue-service:8080`
    pub base_url: String,

    /// Optional bearer token
    pub token: Option<Secret<String>>,

    #[serde(default = "default_api_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_api_attempts")]
    pub max_attempts: usize,

    #[serde(default = "default_api_retry_delay")]
    pub retry_base_delay_ms: u64,
}

impl IssuesApiSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The token, unless it is blank.
    pub fn bearer_token(&self) -> Option<Secret<String>> {
        self.token
            .as_ref()
            .filter(|token| !token.expose_secret().is_empty())
            .cloned()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("STORE__API__BASE_URL"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidUrl("STORE__API__BASE_URL"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidRetryAttempts);
        }
        Ok(())
    }
}

fn default_min_connections() -> u32 {
    1
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_api_timeout() -> u64 {
    30
}

fn default_api_attempts() -> usize {
    3
}

fn default_api_retry_delay() -> u64 {
    250
}
