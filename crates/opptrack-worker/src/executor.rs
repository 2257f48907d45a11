//! Job executor that dispatches claimed jobs to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use opptrack_core::AppError;
use opptrack_entity::job::Job;

/// A handler for one job type.
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// The job type this handler processes.
    fn job_type(&self) -> &str;

    /// Execute one claimed job.
    async fn execute(&self, job: &Job) -> Result<(), JobExecutionError>;
}

/// Error from job execution.
///
/// The runner retries transient failures until the job's attempt budget
/// runs out; permanent and internal failures fail the job immediately.
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Permanent failure; do not retry.
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// Transient failure; may retry.
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

/// Dispatches jobs to the appropriate handler by job type.
#[derive(Debug, Default)]
pub struct JobExecutor {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobExecutor {
    /// Create an executor with no handlers registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own job type.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type().to_string();
        info!(job_type, "job handler registered");
        self.handlers.insert(job_type, handler);
    }

    /// Execute a job by dispatching to the matching handler.
    pub async fn execute(&self, job: &Job) -> Result<(), JobExecutionError> {
        let handler = self.handlers.get(&job.job_type).ok_or_else(|| {
            JobExecutionError::Permanent(format!(
                "No handler registered for job type '{}'",
                job.job_type
            ))
        })?;

        info!(
            job_id = %job.id,
            job_type = %job.job_type,
            attempt = job.attempts + 1,
            max_attempts = job.max_attempts,
            "executing job"
        );
        handler.execute(job).await
    }

    /// Whether a handler is registered for a job type.
    pub fn has_handler(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct NoopHandler;

    #[async_trait]
    impl JobHandler for NoopHandler {
        fn job_type(&self) -> &str {
            "noop"
        }

        async fn execute(&self, _job: &Job) -> Result<(), JobExecutionError> {
            Ok(())
        }
    }

    #[test]
    fn test_registration() {
        let mut executor = JobExecutor::new();
        assert!(!executor.has_handler("noop"));
        executor.register(Arc::new(NoopHandler));
        assert!(executor.has_handler("noop"));
    }
}
