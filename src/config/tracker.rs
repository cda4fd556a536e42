//! Upstream tracker configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::issue::UNTRIAGED_LABEL;

/// GitHub repository and API settings
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// REST API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Repository owner
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// API token
    pub token: Secret<String>,

    /// Label marking issues that still need triage
    #[serde(default = "default_untriaged_label")]
    pub untriaged_label: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Attempts per request, including the first
    #[serde(default = "default_attempts")]
    pub max_attempts: usize,

    /// Base delay for exponential backoff
    #[serde(default = "default_retry_delay")]
    pub retry_base_delay_ms: u64,
}

impl TrackerConfig {
    /// `owner/repo`
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.owner.trim().is_empty() {
            return Err(ValidationError::MissingRequired("TRACKER__OWNER"));
        }
        if self.repo.trim().is_empty() {
            return Err(ValidationError::MissingRequired("TRACKER__REPO"));
        }
        if self.token.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("TRACKER__TOKEN"));
        }
        if self.untriaged_label.trim().is_empty() {
            return Err(ValidationError::MissingRequired("TRACKER__UNTRIAGED_LABEL"));
        }
        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(ValidationError::InvalidUrl("TRACKER__API_BASE"));
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

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_untriaged_label() -> String {
    UNTRIAGED_LABEL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_attempts() -> usize {
    4
}

fn default_retry_delay() -> u64 {
    500
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TrackerConfig {
        TrackerConfig {
            api_base: default_api_base(),
            owner: "dotnet".to_string(),
            repo: "aspire".to_string(),
            token: Secret::new("ghp_xxx".to_string()),
            untriaged_label: default_untriaged_label(),
            request_timeout_secs: default_timeout(),
            max_attempts: default_attempts(),
            retry_base_delay_ms: default_retry_delay(),
        }
    }

    #[test]
    fn test_repository_name() {
        assert_eq!(config().repository(), "dotnet/aspire");
        assert_eq!(config().untriaged_label, "untriaged");
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_validation_missing_token() {
        let config = TrackerConfig {
            token: Secret::new(String::new()),
            ..config()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("TRACKER__TOKEN"))
        );
    }

    #[test]
    fn test_validation_zero_attempts() {
        let config = TrackerConfig {
            max_attempts: 0,
            ..config()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidRetryAttempts));
    }
}
