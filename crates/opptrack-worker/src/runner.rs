//! Worker runner: polls the queue and executes claimed jobs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tracing::{error, info, trace, warn};

use opptrack_core::config::WorkerConfig;
use opptrack_entity::job::NOTIFICATION_QUEUE;

use crate::executor::{JobExecutionError, JobExecutor};
use crate::queue::JobQueue;

/// Main worker loop.
///
/// Polls the configured queues at a fixed interval and runs up to
/// `concurrency` jobs at once; shutdown waits for in-flight jobs.
#[derive(Debug)]
pub struct WorkerRunner {
    queue: Arc<JobQueue>,
    executor: Arc<JobExecutor>,
    config: WorkerConfig,
    worker_id: String,
    queues: Vec<String>,
}

impl WorkerRunner {
    /// Create a runner polling the notification queue.
    pub fn new(
        queue: Arc<JobQueue>,
        executor: Arc<JobExecutor>,
        config: WorkerConfig,
        worker_id: String,
    ) -> Self {
        Self {
            queue,
            executor,
            config,
            worker_id,
            queues: vec![NOTIFICATION_QUEUE.to_string()],
        }
    }

    /// Override the set of queues to poll, in priority order.
    pub fn with_queues(mut self, queues: Vec<String>) -> Self {
        self.queues = queues;
        self
    }

    /// Run until the cancel signal flips to `true`.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(
            worker_id = %self.worker_id,
            concurrency = self.config.concurrency,
            poll_interval = self.config.poll_interval_seconds,
            queues = ?self.queues,
            "worker started"
        );
        match self.queue.stats().await {
            Ok(stats) => info!(
                pending = stats.pending,
                running = stats.running,
                failed = stats.failed,
                "queue backlog at startup"
            ),
            Err(e) => warn!(error = %e, "failed to read queue stats"),
        }

        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.concurrency));
        let poll_interval = self.config.poll_interval();

        loop {
            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        info!(worker_id = %self.worker_id, "shutdown signal received");
                        break;
                    }
                }
                _ = self.poll_and_execute(&semaphore) => {
                    tokio::select! {
                        _ = cancel.changed() => {
                            if *cancel.borrow() {
                                info!(worker_id = %self.worker_id, "shutting down");
                                break;
                            }
                        }
                        _ = time::sleep(poll_interval) => {}
                    }
                }
            }
        }

        info!(worker_id = %self.worker_id, "waiting for in-flight jobs");
        let max_permits = self.config.concurrency as u32;
        let _ = time::timeout(Duration::from_secs(30), semaphore.acquire_many(max_permits)).await;
        info!(worker_id = %self.worker_id, "worker stopped");
    }

    async fn poll_and_execute(&self, semaphore: &Arc<tokio::sync::Semaphore>) {
        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                trace!("all worker slots occupied");
                return;
            }
        };

        let queue_refs: Vec<&str> = self.queues.iter().map(|s| s.as_str()).collect();
        match self.queue.dequeue(&queue_refs).await {
            Ok(Some(job)) => {
                let queue = Arc::clone(&self.queue);
                let executor = Arc::clone(&self.executor);
                tokio::spawn(async move {
                    let _permit = permit;
                    let job_id = job.id;
                    let attempts_left = job.has_attempts_left();

                    match executor.execute(&job).await {
                        Ok(()) => {
                            if let Err(e) = queue.complete(job_id).await {
                                error!(%job_id, error = %e, "failed to mark job completed");
                            }
                        }
                        Err(JobExecutionError::Transient(msg)) => {
                            warn!(%job_id, msg, "job failed transiently");
                            let outcome = if attempts_left {
                                queue.retry(job_id).await
                            } else {
                                queue.fail(job_id, &msg).await
                            };
                            if let Err(e) = outcome {
                                error!(%job_id, error = %e, "failed to record job outcome");
                            }
                        }
                        Err(JobExecutionError::Permanent(msg)) => {
                            error!(%job_id, msg, "job failed permanently");
                            if let Err(e) = queue.fail(job_id, &msg).await {
                                error!(%job_id, error = %e, "failed to mark job failed");
                            }
                        }
                        Err(JobExecutionError::Internal(err)) => {
                            let msg = err.to_string();
                            error!(%job_id, msg, "job hit an internal error");
                            if let Err(e) = queue.fail(job_id, &msg).await {
                                error!(%job_id, error = %e, "failed to mark job failed");
                            }
                        }
                    }
                });
            }
            Ok(None) => {
                drop(permit);
                trace!("no jobs available");
            }
            Err(e) => {
                drop(permit);
                error!(error = %e, "failed to dequeue job");
            }
        }
    }
}
