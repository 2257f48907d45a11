//! WhatsApp delivery via the Graph API.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use opptrack_core::config::WhatsAppTransportConfig;
use opptrack_core::error::{AppError, ErrorKind};
use opptrack_core::result::AppResult;
use opptrack_entity::notification::DeliveryMethod;

use super::transport::{ChannelTransport, OutboundMessage};

/// Sends short-form notices through the WhatsApp Business (Graph) API.
#[derive(Debug, Clone)]
pub struct WhatsAppTransport {
    config: WhatsAppTransportConfig,
    http: reqwest::Client,
}

impl WhatsAppTransport {
    /// Create a WhatsApp transport from configuration.
    pub fn new(config: WhatsAppTransportConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.config.api_url.trim_end_matches('/'),
            self.config.api_version,
            self.config.phone_number_id
        )
    }
}

#[async_trait]
impl ChannelTransport for WhatsAppTransport {
    fn method(&self) -> DeliveryMethod {
        DeliveryMethod::Whatsapp
    }

    async fn send(&self, recipients: &[String], message: &OutboundMessage) -> AppResult<()> {
        if message.body.trim().is_empty() {
            return Err(AppError::validation(
                "WhatsApp notifications require a message",
            ));
        }

        let url = self.messages_url();
        for to in recipients {
            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.config.access_token)
                .json(&json!({
                    "messaging_product": "whatsapp",
                    "recipient_type": "individual",
                    "to": to,
                    "type": "text",
                    "text": { "preview_url": false, "body": message.body },
                }))
                .send()
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::ExternalService, "Graph API request failed", e)
                })?;

            if !response.status().is_success() {
                return Err(AppError::external(format!(
                    "Graph API returned {} for recipient {to}",
                    response.status()
                )));
            }
        }
        debug!(recipients = recipients.len(), "whatsapp notice delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_url_layout() {
        let transport = WhatsAppTransport::new(
            WhatsAppTransportConfig {
                api_url: "https://graph.facebook.com/".to_string(),
                api_version: "v21.0".to_string(),
                access_token: "token".to_string(),
                phone_number_id: "123456".to_string(),
            },
            reqwest::Client::new(),
        );
        assert_eq!(
            transport.messages_url(),
            "https://graph.facebook.com/v21.0/123456/messages"
        );
    }
}
