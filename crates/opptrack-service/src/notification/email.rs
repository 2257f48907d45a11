//! Email delivery via an HTTP mail API.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use opptrack_core::config::EmailTransportConfig;
use opptrack_core::error::{AppError, ErrorKind};
use opptrack_core::result::AppResult;
use opptrack_entity::notification::DeliveryMethod;

use super::transport::{ChannelTransport, OutboundMessage};

/// Sends long-form notices through the configured mail provider.
#[derive(Debug, Clone)]
pub struct EmailTransport {
    config: EmailTransportConfig,
    http: reqwest::Client,
}

impl EmailTransport {
    /// Create an email transport from configuration.
    pub fn new(config: EmailTransportConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }
}

#[async_trait]
impl ChannelTransport for EmailTransport {
    fn method(&self) -> DeliveryMethod {
        DeliveryMethod::Email
    }

    async fn send(&self, recipients: &[String], message: &OutboundMessage) -> AppResult<()> {
        let subject = match message.subject.as_deref() {
            Some(subject) if !subject.trim().is_empty() => subject,
            _ => {
                return Err(AppError::validation(
                    "Email notifications require both a subject and a message",
                ))
            }
        };
        if message.body.trim().is_empty() {
            return Err(AppError::validation(
                "Email notifications require both a subject and a message",
            ));
        }
        if recipients.is_empty() {
            return Ok(());
        }

        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "from": self.config.from_address,
                "to": recipients,
                "subject": subject,
                "html": message.body,
            }))
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::ExternalService, "Mail API request failed", e)
            })?;

        if !response.status().is_success() {
            return Err(AppError::external(format!(
                "Mail API returned {}",
                response.status()
            )));
        }
        debug!(recipients = recipients.len(), "email notice delivered");
        Ok(())
    }
}
