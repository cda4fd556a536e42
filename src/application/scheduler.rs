//! Fixed-interval polling workers for the batch passes.
//!
//! Each job gets its own worker task. A worker runs one pass, waits for the
//! interval, and repeats until the shutdown signal flips to `true`. The signal
//! is checked before every pass and raced against the wait; a pass that has
//! started always runs to completion, so passes of one job never overlap.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use super::handlers::sync::RunSyncPassHandler;
use super::handlers::triage::RunTriagePassHandler;
use super::handlers::PassError;

/// Default wait between the end of one pass and the start of the next.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);

/// A unit of work a [`PollingWorker`] repeats.
#[async_trait]
pub trait PollingJob: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Runs one full pass.
    async fn run_pass(&self) -> Result<(), PassError>;
}

#[async_trait]
impl PollingJob for RunTriagePassHandler {
    fn name(&self) -> &'static str {
        "triage"
    }

    async fn run_pass(&self) -> Result<(), PassError> {
        self.handle().await.map(|_| ())
    }
}

#[async_trait]
impl PollingJob for RunSyncPassHandler {
    fn name(&self) -> &'static str {
        "sync"
    }

    async fn run_pass(&self) -> Result<(), PassError> {
        self.handle().await.map(|_| ())
    }
}

#[derive(Debug, Clone)]
pub struct PollingWorkerConfig {
    pub interval: Duration,
}

impl Default for PollingWorkerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PollingWorkerConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Drives one [`PollingJob`] on a fixed interval.
pub struct PollingWorker {
    job: Arc<dyn PollingJob>,
    config: PollingWorkerConfig,
}

impl PollingWorker {
    pub fn new(job: Arc<dyn PollingJob>, config: PollingWorkerConfig) -> Self {
        Self { job, config }
    }

    /// Runs passes until `shutdown` holds `true` or its sender is dropped.
    ///
    /// Returns the number of passes started.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> usize {
        let name = self.job.name();
        let mut passes = 0;
        tracing::info!(
            job = name,
            interval_secs = self.config.interval.as_secs(),
            "worker started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.run_once().await;
            passes += 1;

            if self.wait_for_next_pass(&mut shutdown).await {
                break;
            }
        }

        tracing::info!(job = name, passes, "worker stopped");
        passes
    }

    /// Waits out the full interval. Returns `true` if shutdown was requested
    /// or the sender went away before it elapsed.
    async fn wait_for_next_pass(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let wait = tokio::time::sleep(self.config.interval);
        tokio::pin!(wait);

        loop {
            tokio::select! {
                _ = &mut wait => return false,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return true;
                    }
                }
            }
        }
    }

    /// Runs a single pass, logging its failure.
    pub async fn run_once(&self) {
        let name = self.job.name();
        tracing::info!(job = name, "Worker running at: {}", chrono::Utc::now());
        if let Err(err) = self.job.run_pass().await {
            tracing::error!(job = name, error = %err, "pass failed");
        }
    }
}

/// Asks every worker listening on `shutdown` to stop after its current pass.
///
/// Returns `false` when no worker is left to receive the signal.
pub fn request_shutdown(shutdown: &watch::Sender<bool>) -> bool {
    if shutdown.send(true).is_err() {
        tracing::debug!("no workers left to receive the shutdown signal");
        return false;
    }
    true
}
