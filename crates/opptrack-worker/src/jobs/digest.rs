//! Scheduled digest assembly.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use opptrack_entity::job::Job;
use opptrack_service::notification::{DigestOutcome, NotificationDispatcher};

use crate::executor::{JobExecutionError, JobHandler};

use super::DIGEST_JOB_TYPE;

/// Executes `notification_digest` jobs.
///
/// The dispatcher does the real work; an empty window is a successful
/// run, not a failure.
#[derive(Debug)]
pub struct DigestJobHandler {
    dispatcher: Arc<NotificationDispatcher>,
}

impl DigestJobHandler {
    /// Create a digest handler over the dispatcher.
    pub fn new(dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl JobHandler for DigestJobHandler {
    fn job_type(&self) -> &str {
        DIGEST_JOB_TYPE
    }

    async fn execute(&self, job: &Job) -> Result<(), JobExecutionError> {
        match self.dispatcher.on_digest().await? {
            DigestOutcome::NoContent => {
                info!(job_id = %job.id, "digest window empty; nothing sent");
            }
            DigestOutcome::Dispatched { jobs, recipients } => {
                info!(job_id = %job.id, jobs, recipients, "digest fanned out");
            }
        }
        Ok(())
    }
}
