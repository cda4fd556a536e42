//! Polling worker configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::handlers::DEFAULT_SYNC_PAGE_SIZE;

/// Which passes run and how often
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub triage_enabled: bool,

    #[serde(default = "default_interval")]
    pub triage_interval_secs: u64,

    #[serde(default = "default_true")]
    pub sync_enabled: bool,

    #[serde(default = "default_interval")]
    pub sync_interval_secs: u64,

    /// Page size used to read every tracked issue in a sync pass
    #[serde(default = "default_page_size")]
    pub sync_page_size: u32,
}

impl SchedulerConfig {
    pub fn triage_interval(&self) -> Duration {
        Duration::from_secs(self.triage_interval_secs)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.triage_enabled && self.triage_interval_secs == 0 {
            return Err(ValidationError::InvalidInterval("triage"));
        }
        if self.sync_enabled && self.sync_interval_secs == 0 {
            return Err(ValidationError::InvalidInterval("sync"));
        }
        if self.sync_page_size == 0 {
            return Err(ValidationError::InvalidPageSize);
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            triage_enabled: true,
            triage_interval_secs: default_interval(),
            sync_enabled: true,
            sync_interval_secs: default_interval(),
            sync_page_size: default_page_size(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_interval() -> u64 {
    300
}

fn default_page_size() -> u32 {
    DEFAULT_SYNC_PAGE_SIZE
}
