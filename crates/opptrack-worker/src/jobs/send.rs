//! Delivery of queued notification sends.

use async_trait::async_trait;
use tracing::info;

use opptrack_entity::job::Job;
use opptrack_service::notification::{
    OutboundMessage, SendJobPayload, TransportRegistry, SEND_JOB_TYPE,
};

use crate::executor::{JobExecutionError, JobHandler};

/// Executes `notification_send` jobs through the matching transport.
///
/// A malformed payload or a missing transport fails the job permanently;
/// provider errors are transient and leave the job to the retry budget.
#[derive(Debug)]
pub struct SendJobHandler {
    transports: TransportRegistry,
}

impl SendJobHandler {
    /// Create a send handler over the configured transports.
    pub fn new(transports: TransportRegistry) -> Self {
        Self { transports }
    }
}

#[async_trait]
impl JobHandler for SendJobHandler {
    fn job_type(&self) -> &str {
        SEND_JOB_TYPE
    }

    async fn execute(&self, job: &Job) -> Result<(), JobExecutionError> {
        let payload: SendJobPayload = serde_json::from_value(job.payload.clone())
            .map_err(|e| JobExecutionError::Permanent(format!("Malformed send payload: {e}")))?;

        let transport = self.transports.get(payload.method).ok_or_else(|| {
            JobExecutionError::Permanent(format!(
                "No transport configured for method '{}'",
                payload.method
            ))
        })?;

        let message = OutboundMessage {
            subject: payload.subject.clone(),
            body: payload.message.clone(),
        };
        transport
            .send(&payload.recipients, &message)
            .await
            .map_err(|e| {
                if e.is_validation() {
                    JobExecutionError::Permanent(e.to_string())
                } else {
                    JobExecutionError::Transient(e.to_string())
                }
            })?;

        info!(
            job_id = %job.id,
            method = %payload.method,
            recipients = payload.recipients.len(),
            "notification delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use opptrack_core::result::AppResult;
    use opptrack_entity::job::{JobPriority, JobStatus};
    use opptrack_entity::notification::DeliveryMethod;
    use opptrack_service::notification::ChannelTransport;

    use super::*;

    #[derive(Debug)]
    struct AlwaysOkTransport;

    #[async_trait]
    impl ChannelTransport for AlwaysOkTransport {
        fn method(&self) -> DeliveryMethod {
            DeliveryMethod::Sms
        }

        async fn send(&self, _recipients: &[String], _message: &OutboundMessage) -> AppResult<()> {
            Ok(())
        }
    }

    fn job_with(payload: serde_json::Value) -> Job {
        Job {
            id: Uuid::new_v4(),
            job_type: SEND_JOB_TYPE.to_string(),
            queue: "notifications".to_string(),
            priority: JobPriority::Normal,
            payload,
            error_message: None,
            status: JobStatus::Running,
            attempts: 0,
            max_attempts: 3,
            scheduled_at: None,
            started_at: None,
            completed_at: None,
            worker_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_malformed_payload_is_permanent() {
        let handler = SendJobHandler::new(TransportRegistry::new());
        let err = handler
            .execute(&job_with(json!({"method": "carrier-pigeon"})))
            .await
            .expect_err("malformed payload must fail");
        assert!(matches!(err, JobExecutionError::Permanent(_)));
    }

    #[tokio::test]
    async fn test_missing_transport_is_permanent() {
        let handler = SendJobHandler::new(TransportRegistry::new());
        let payload = json!({
            "method": "sms",
            "recipients": ["+254700000001"],
            "subject": null,
            "message": "short",
        });
        let err = handler
            .execute(&job_with(payload))
            .await
            .expect_err("missing transport must fail");
        assert!(matches!(err, JobExecutionError::Permanent(_)));
    }

    #[tokio::test]
    async fn test_delivery_through_registered_transport() {
        let mut transports = TransportRegistry::new();
        transports.register(Arc::new(AlwaysOkTransport));
        let handler = SendJobHandler::new(transports);

        let payload = json!({
            "method": "sms",
            "recipients": ["+254700000001"],
            "subject": null,
            "message": "short",
        });
        assert!(handler.execute(&job_with(payload)).await.is_ok());
    }
}
