//! Cron scheduler for the periodic digest.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing::{debug, error, info};

use opptrack_core::config::DigestConfig;
use opptrack_core::result::AppResult;
use opptrack_core::AppError;
use opptrack_entity::job::{CreateJob, JobPriority, NOTIFICATION_QUEUE};

use crate::jobs::DIGEST_JOB_TYPE;
use crate::queue::JobQueue;

/// Cron-based scheduler for periodic tasks.
///
/// Scheduled triggers only enqueue jobs; the work itself always runs on
/// the worker loop so that a slow digest cannot stall the scheduler.
pub struct CronScheduler {
    scheduler: JobScheduler,
    queue: Arc<JobQueue>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler.
    pub async fn new(queue: Arc<JobQueue>) -> AppResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;
        Ok(Self { scheduler, queue })
    }

    /// Register the digest trigger if digests are enabled.
    pub async fn register_digest(&self, config: &DigestConfig) -> AppResult<()> {
        if !config.enabled {
            info!("digest disabled; no schedule registered");
            return Ok(());
        }

        let queue = Arc::clone(&self.queue);
        let job = CronJob::new_async(config.cron.as_str(), move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            Box::pin(async move {
                debug!("scheduling digest job");
                let data = CreateJob {
                    job_type: DIGEST_JOB_TYPE.to_string(),
                    queue: NOTIFICATION_QUEUE.to_string(),
                    priority: JobPriority::Low,
                    payload: serde_json::json!({}),
                    max_attempts: 1,
                    scheduled_at: None,
                };
                if let Err(e) = queue.enqueue(data).await {
                    error!(error = %e, "failed to enqueue digest job");
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!(
                "Invalid digest cron expression '{}': {e}",
                config.cron
            ))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add digest schedule: {e}")))?;
        info!(cron = %config.cron, "digest schedule registered");
        Ok(())
    }

    /// Start the scheduler.
    pub async fn start(&self) -> AppResult<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;
        info!("cron scheduler started");
        Ok(())
    }

    /// Shut the scheduler down.
    pub async fn shutdown(&self) -> AppResult<()> {
        self.scheduler
            .clone()
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shut down scheduler: {e}")))?;
        info!("cron scheduler stopped");
        Ok(())
    }
}
