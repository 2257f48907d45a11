//! Job queue over the persistent job table.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use opptrack_core::result::AppResult;
use opptrack_database::repositories::JobRepository;
use opptrack_entity::job::{CreateJob, Job, JobStatus};

/// Queue facade used by the runner and the scheduler.
///
/// Claims are worker-scoped: a dequeued job is marked running under this
/// worker's identifier and invisible to other pollers.
#[derive(Debug, Clone)]
pub struct JobQueue {
    repo: Arc<JobRepository>,
    worker_id: String,
}

impl JobQueue {
    /// Create a queue bound to one worker identity.
    pub fn new(repo: Arc<JobRepository>, worker_id: String) -> Self {
        Self { repo, worker_id }
    }

    /// Enqueue a new job.
    pub async fn enqueue(&self, data: CreateJob) -> AppResult<Job> {
        let job = self.repo.create(&data).await?;
        debug!(
            job_id = %job.id,
            job_type = %job.job_type,
            queue = %job.queue,
            "job enqueued"
        );
        Ok(job)
    }

    /// Claim the next available job from the given queues, in order.
    pub async fn dequeue(&self, queues: &[&str]) -> AppResult<Option<Job>> {
        for queue in queues {
            if let Some(job) = self.repo.claim_next(queue, &self.worker_id).await? {
                debug!(job_id = %job.id, job_type = %job.job_type, queue, "job claimed");
                return Ok(Some(job));
            }
        }
        Ok(None)
    }

    /// Mark a job as completed.
    pub async fn complete(&self, job_id: Uuid) -> AppResult<()> {
        self.repo.mark_completed(job_id).await?;
        debug!(%job_id, "job completed");
        Ok(())
    }

    /// Mark a job as failed.
    pub async fn fail(&self, job_id: Uuid, error: &str) -> AppResult<()> {
        self.repo.mark_failed(job_id, error).await?;
        debug!(%job_id, error, "job failed");
        Ok(())
    }

    /// Return a failed job to pending for another attempt.
    pub async fn retry(&self, job_id: Uuid) -> AppResult<()> {
        self.repo.retry(job_id).await?;
        debug!(%job_id, "job returned for retry");
        Ok(())
    }

    /// Current queue statistics.
    pub async fn stats(&self) -> AppResult<QueueStats> {
        Ok(QueueStats {
            pending: self.repo.count_by_status(JobStatus::Pending).await?,
            running: self.repo.count_by_status(JobStatus::Running).await?,
            failed: self.repo.count_by_status(JobStatus::Failed).await?,
            worker_id: self.worker_id.clone(),
        })
    }
}

/// Snapshot of queue depth by status.
#[derive(Debug, Clone)]
pub struct QueueStats {
    /// Jobs waiting to run.
    pub pending: i64,
    /// Jobs currently claimed by a worker.
    pub running: i64,
    /// Jobs that exhausted their attempts.
    pub failed: i64,
    /// The worker reporting the snapshot.
    pub worker_id: String,
}
