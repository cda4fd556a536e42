//! Triage Sync worker process.
//!
//! Loads configuration, wires the adapters and runs one polling worker per
//! enabled pass until Ctrl-C.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use triage_sync::adapters::{
    ClassificationClient, GithubTracker, GithubTrackerConfig, InMemoryIssueStore, IssuesApiConfig,
    IssuesApiStore, OpenAIConfig, OpenAIProvider, PostgresIssueStore,
};
use triage_sync::application::{
    request_shutdown, PollingJob, PollingWorker, PollingWorkerConfig, RunSyncPassHandler,
    RunTriagePassHandler, TriageIssueHandler,
};
use triage_sync::config::{
    AiConfig, AppConfig, ConfigError, LoggingConfig, StoreBackend, StoreConfig, TrackerConfig,
    ValidationError,
};
use triage_sync::ports::{AIError, IssueStore, IssueTracker, StoreError, TrackerError};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("tracker setup failed: {0}")]
    Tracker(#[from] TrackerError),

    #[error("model provider setup failed: {0}")]
    Ai(#[from] AIError),

    #[error("store setup failed: {0}")]
    Store(#[from] StoreError),

    #[error("database setup failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.logging)?;

    let repository = config.tracker.repository();
    let label = config.tracker.untriaged_label.clone();
    tracing::info!(
        repository = %repository,
        store = ?config.store.backend,
        model = %config.ai.model,
        "starting triage-sync"
    );

    let tracker: Arc<dyn IssueTracker> = Arc::new(GithubTracker::new(github_config(&config.tracker))?);
    let store = build_store(&config.store).await?;
    let provider = Arc::new(OpenAIProvider::new(openai_config(&config.ai))?);
    let classifier = Arc::new(ClassificationClient::new(provider));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut workers = Vec::new();

    if config.scheduler.triage_enabled {
        let triage = TriageIssueHandler::new(store.clone(), classifier, repository);
        let job = RunTriagePassHandler::new(tracker.clone(), store.clone(), triage, label.clone());
        workers.push(spawn_worker(
            Arc::new(job),
            PollingWorkerConfig::default().with_interval(config.scheduler.triage_interval()),
            shutdown_rx.clone(),
        ));
    }

    if config.scheduler.sync_enabled {
        let job = RunSyncPassHandler::new(tracker, store, label)
            .with_page_size(config.scheduler.sync_page_size);
        workers.push(spawn_worker(
            Arc::new(job),
            PollingWorkerConfig::default().with_interval(config.scheduler.sync_interval()),
            shutdown_rx,
        ));
    }

    if workers.is_empty() {
        tracing::warn!("no passes enabled, exiting");
        return Ok(());
    }

    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown requested, waiting for running passes");
    request_shutdown(&shutdown_tx);

    for worker in workers {
        worker.await?;
    }
    tracing::info!("triage-sync stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<(), ValidationError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(logging.env_filter()?)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn github_config(tracker: &TrackerConfig) -> GithubTrackerConfig {
    GithubTrackerConfig::new(&tracker.owner, &tracker.repo, tracker.token.clone())
        .with_api_base(&tracker.api_base)
        .with_request_timeout(tracker.request_timeout())
        .with_retry(tracker.max_attempts, tracker.retry_base_delay_ms)
}

fn openai_config(ai: &AiConfig) -> OpenAIConfig {
    let mut config = OpenAIConfig::new(ai.api_key().unwrap_or_default())
        .with_model(&ai.model)
        .with_timeout(ai.timeout())
        .with_max_retries(ai.max_retries)
        .with_retry_base_delay_ms(ai.retry_base_delay_ms);
    if let Some(base_url) = &ai.base_url {
        config = config.with_base_url(base_url);
    }
    config
}

async fn build_store(store: &StoreConfig) -> Result<Arc<dyn IssueStore>, StartupError> {
    match store.backend {
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory store; tracked issues are lost on restart");
            Ok(Arc::new(InMemoryIssueStore::new()))
        }
        StoreBackend::Postgres => {
            let database = store
                .database
                .as_ref()
                .ok_or(ValidationError::MissingRequired("STORE__DATABASE__URL"))?;
            let postgres = PostgresIssueStore::new(database.connect_lazy()?);
            if database.ensure_schema {
                postgres.ensure_schema().await?;
            }
            Ok(Arc::new(postgres))
        }
        StoreBackend::IssuesApi => {
            let api = store
                .api
                .as_ref()
                .ok_or(ValidationError::MissingRequired("STORE__API__BASE_URL"))?;
            let mut config = IssuesApiConfig::new(&api.base_url)
                .with_request_timeout(api.request_timeout())
                .with_retry(api.max_attempts, api.retry_base_delay_ms);
            if let Some(token) = api.bearer_token() {
                config = config.with_token(token);
            }
            Ok(Arc::new(IssuesApiStore::new(config)?))
        }
    }
}

fn spawn_worker(
    job: Arc<dyn PollingJob>,
    config: PollingWorkerConfig,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<usize> {
    tokio::spawn(async move { PollingWorker::new(job, config).run(shutdown).await })
}
