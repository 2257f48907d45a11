//! SMS delivery via an HTTP gateway.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use opptrack_core::config::SmsTransportConfig;
use opptrack_core::error::{AppError, ErrorKind};
use opptrack_core::result::AppResult;
use opptrack_entity::notification::DeliveryMethod;

use super::transport::{ChannelTransport, OutboundMessage};

/// Sends short-form notices through the configured SMS gateway.
///
/// The gateway accepts one recipient per request, so delivery iterates
/// the recipient list and stops at the first failure.
#[derive(Debug, Clone)]
pub struct SmsTransport {
    config: SmsTransportConfig,
    http: reqwest::Client,
}

impl SmsTransport {
    /// Create an SMS transport from configuration.
    pub fn new(config: SmsTransportConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }
}

#[async_trait]
impl ChannelTransport for SmsTransport {
    fn method(&self) -> DeliveryMethod {
        DeliveryMethod::Sms
    }

    async fn send(&self, recipients: &[String], message: &OutboundMessage) -> AppResult<()> {
        if message.body.trim().is_empty() {
            return Err(AppError::validation("SMS notifications require a message"));
        }

        for to in recipients {
            let response = self
                .http
                .post(&self.config.api_url)
                .bearer_auth(&self.config.api_key)
                .json(&json!({
                    "from": self.config.sender,
                    "to": to,
                    "message": message.body,
                }))
                .send()
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::ExternalService, "SMS gateway request failed", e)
                })?;

            if !response.status().is_success() {
                return Err(AppError::external(format!(
                    "SMS gateway returned {} for recipient {to}",
                    response.status()
                )));
            }
        }
        debug!(recipients = recipients.len(), "sms notice delivered");
        Ok(())
    }
}
