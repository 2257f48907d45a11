//! OppTrack server: opportunity tracking and notification dispatch.
//!
//! Entry point that wires the crates together and runs the background
//! delivery worker and digest scheduler.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use opptrack_core::config::AppConfig;
use opptrack_core::error::AppError;
use opptrack_database::repositories::{
    JobRepository, OpportunityRepository, SubscriptionRepository, UserRepository,
};
use opptrack_entity::notification::DeliveryMethod;
use opptrack_service::notification::{
    email::EmailTransport, sms::SmsTransport, whatsapp::WhatsAppTransport, AudienceSource,
    DigestSource, JobSink, MessageRenderer, NotificationDispatcher, TransportRegistry,
};
use opptrack_service::subscription::SubscriptionService;
use opptrack_worker::executor::JobExecutor;
use opptrack_worker::jobs::{DigestJobHandler, SendJobHandler};
use opptrack_worker::queue::JobQueue;
use opptrack_worker::{CronScheduler, WorkerRunner};

#[tokio::main]
async fn main() {
    let config_path =
        std::env::var("OPPTRACK_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    let config = match AppConfig::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration from '{config_path}': {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing output per the logging configuration.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting OppTrack v{}", env!("CARGO_PKG_VERSION"));

    tracing::info!("Connecting to database...");
    let pool = opptrack_database::connect(&config.database).await?;

    tracing::info!("Running database migrations...");
    opptrack_database::migration::run_migrations(&pool).await?;

    let opportunity_repo = Arc::new(OpportunityRepository::new(pool.clone()));
    let subscription_repo = Arc::new(SubscriptionRepository::new(pool.clone()));
    let user_repo = Arc::new(UserRepository::new(pool.clone()));
    let job_repo = Arc::new(JobRepository::new(pool.clone()));

    // Configured broadcast channels must exist before the first save.
    let subscription_service = Arc::new(SubscriptionService::new(
        Arc::clone(&subscription_repo),
        Arc::clone(&opportunity_repo),
        Arc::clone(&user_repo),
    ));
    if let Some(name) = config.notification.new_opportunity_channel.as_deref() {
        subscription_service
            .ensure_channel(name, Some("New opportunity alerts"), DeliveryMethod::Email)
            .await?;
    }
    if let Some(name) = config.notification.digest.channel.as_deref() {
        subscription_service
            .ensure_channel(name, Some("Weekly opportunity digest"), DeliveryMethod::Email)
            .await?;
    }

    let renderer = Arc::new(MessageRenderer::new(config.notification.site_url.clone())?);
    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::clone(&subscription_repo) as Arc<dyn AudienceSource>,
        Arc::clone(&opportunity_repo) as Arc<dyn DigestSource>,
        renderer,
        Arc::clone(&job_repo) as Arc<dyn JobSink>,
        config.notification.clone(),
    ));

    let http = reqwest::Client::new();
    let mut transports = TransportRegistry::new();
    transports.register(Arc::new(EmailTransport::new(
        config.notification.email.clone(),
        http.clone(),
    )));
    transports.register(Arc::new(SmsTransport::new(
        config.notification.sms.clone(),
        http.clone(),
    )));
    transports.register(Arc::new(WhatsAppTransport::new(
        config.notification.whatsapp.clone(),
        http,
    )));

    let mut executor = JobExecutor::new();
    executor.register(Arc::new(SendJobHandler::new(transports)));
    executor.register(Arc::new(DigestJobHandler::new(Arc::clone(&dispatcher))));
    let executor = Arc::new(executor);

    let worker_id = format!(
        "opptrack-{}-{}",
        std::env::var("HOSTNAME").unwrap_or_else(|_| "local".to_string()),
        std::process::id()
    );
    let queue = Arc::new(JobQueue::new(Arc::clone(&job_repo), worker_id.clone()));

    let scheduler = CronScheduler::new(Arc::clone(&queue)).await?;
    scheduler.register_digest(&config.notification.digest).await?;
    scheduler.start().await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner_handle = if config.worker.enabled {
        let runner = WorkerRunner::new(
            Arc::clone(&queue),
            executor,
            config.worker.clone(),
            worker_id,
        );
        Some(tokio::spawn(async move { runner.run(shutdown_rx).await }))
    } else {
        tracing::warn!("worker disabled; queued notifications will not be delivered");
        None
    };

    tracing::info!("OppTrack server running; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::internal(format!("Failed to listen for shutdown signal: {e}")))?;

    tracing::info!("Shutting down...");
    scheduler.shutdown().await?;
    let _ = shutdown_tx.send(true);
    if let Some(handle) = runner_handle {
        let _ = handle.await;
    }
    pool.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
