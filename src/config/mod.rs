//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `TRIAGE_SYNC` prefix and
//! `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use triage_sync::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Watching {}", config.tracker.repository());
//! ```

mod ai;
mod error;
mod logging;
mod scheduler;
mod store;
mod tracker;

pub use ai::AiConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use scheduler::SchedulerConfig;
pub use store::{DatabaseConfig, IssuesApiSettings, StoreBackend, StoreConfig};
pub use tracker::TrackerConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Watched repository and GitHub API access
    pub tracker: TrackerConfig,

    /// Model provider (OpenAI-compatible)
    #[serde(default)]
    pub ai: AiConfig,

    /// Where tracked issues live
    #[serde(default)]
    pub store: StoreConfig,

    /// Pass intervals and switches
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `TRIAGE_SYNC` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `TRIAGE_SYNC__TRACKER__TOKEN=...` -> `tracker.token = ...`
    /// - `TRIAGE_SYNC__STORE__DATABASE__URL=...` -> `store.database.url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("TRIAGE_SYNC")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.tracker.validate()?;
        self.ai.validate()?;
        self.store.validate()?;
        self.scheduler.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
