//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::{JobPriority, JobStatus};

/// Queue name shared by all notification jobs.
pub const NOTIFICATION_QUEUE: &str = "notifications";

/// A deferred background job.
///
/// The triggering code path enqueues and returns immediately; delivery
/// happens on a worker. Job types in use: `"notification_send"` (one per
/// (event, delivery method) pair) and `"notification_digest"`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Unique job identifier.
    pub id: Uuid,
    /// Job type identifier.
    pub job_type: String,
    /// Queue name.
    pub queue: String,
    /// Job priority.
    pub priority: JobPriority,
    /// Job-specific payload (JSON).
    pub payload: serde_json::Value,
    /// Error message on failure.
    pub error_message: Option<String>,
    /// Current job status.
    pub status: JobStatus,
    /// Number of execution attempts.
    pub attempts: i32,
    /// Maximum allowed attempts.
    pub max_attempts: i32,
    /// Scheduled execution time (None = immediate).
    pub scheduled_at: Option<DateTime<Utc>>,
    /// When the job started executing.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// Worker ID that picked up the job.
    pub worker_id: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Whether the attempt budget allows another run.
    ///
    /// `attempts` counts the attempt currently in flight, so a claimed
    /// job with `attempts == max_attempts` is on its final try.
    pub fn has_attempts_left(&self) -> bool {
        self.attempts < self.max_attempts
    }
}

/// Data required to create a new job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    /// Job type identifier.
    pub job_type: String,
    /// Queue name.
    pub queue: String,
    /// Priority.
    pub priority: JobPriority,
    /// Job-specific payload.
    pub payload: serde_json::Value,
    /// Maximum retry attempts.
    pub max_attempts: i32,
    /// Scheduled execution time.
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl CreateJob {
    /// A normal-priority job on the `notifications` queue.
    pub fn notification(job_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            job_type: job_type.into(),
            queue: NOTIFICATION_QUEUE.to_string(),
            priority: JobPriority::Normal,
            payload,
            max_attempts: 3,
            scheduled_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claimed(attempts: i32, max_attempts: i32) -> Job {
        Job {
            id: Uuid::new_v4(),
            job_type: "notification_send".to_string(),
            queue: NOTIFICATION_QUEUE.to_string(),
            priority: JobPriority::Normal,
            payload: serde_json::json!({}),
            error_message: None,
            status: JobStatus::Running,
            attempts,
            max_attempts,
            scheduled_at: None,
            started_at: Some(Utc::now()),
            completed_at: None,
            worker_id: Some("opptrack-test-1".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_attempt_budget_allows_every_configured_attempt() {
        // Claiming increments `attempts`, so the first run sees 1.
        assert!(claimed(1, 3).has_attempts_left());
        assert!(claimed(2, 3).has_attempts_left());
        assert!(!claimed(3, 3).has_attempts_left());
    }

    #[test]
    fn test_single_attempt_jobs_never_requeue() {
        assert!(!claimed(1, 1).has_attempts_left());
    }
}
