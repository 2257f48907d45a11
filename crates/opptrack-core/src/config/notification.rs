//! Notification channel and transport configuration.

use serde::{Deserialize, Serialize};

/// Notification dispatch configuration.
///
/// `new_opportunity_channel` names the broadcast channel that receives
/// creation alerts. When it is absent, creation events are silent no-ops.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Name of the broadcast channel for new-opportunity alerts.
    #[serde(default)]
    pub new_opportunity_channel: Option<String>,
    /// Externally visible base URL used in notification links.
    #[serde(default = "default_site_url")]
    pub site_url: String,
    /// Periodic digest settings.
    #[serde(default)]
    pub digest: DigestConfig,
    /// Email transport settings.
    #[serde(default)]
    pub email: EmailTransportConfig,
    /// SMS transport settings.
    #[serde(default)]
    pub sms: SmsTransportConfig,
    /// WhatsApp transport settings.
    #[serde(default)]
    pub whatsapp: WhatsAppTransportConfig,
}

/// Periodic digest configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    /// Whether the scheduled digest is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// The broadcast channel whose subscribers receive the digest.
    #[serde(default)]
    pub channel: Option<String>,
    /// Trailing window, in days, of opportunities to include.
    #[serde(default = "default_digest_days")]
    pub days: i64,
    /// Cron expression for the digest trigger (seconds-resolution).
    #[serde(default = "default_digest_cron")]
    pub cron: String,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel: None,
            days: default_digest_days(),
            cron: default_digest_cron(),
        }
    }
}

/// HTTP mail API transport configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailTransportConfig {
    /// Endpoint of the mail provider's send API.
    #[serde(default)]
    pub api_url: String,
    /// API key for the mail provider.
    #[serde(default)]
    pub api_key: String,
    /// Sender address placed on outgoing mail.
    #[serde(default = "default_from_address")]
    pub from_address: String,
}

/// SMS gateway transport configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmsTransportConfig {
    /// Endpoint of the SMS gateway's send API.
    #[serde(default)]
    pub api_url: String,
    /// API key for the gateway.
    #[serde(default)]
    pub api_key: String,
    /// Sender identifier placed on outgoing messages.
    #[serde(default)]
    pub sender: String,
}

/// WhatsApp Business (Graph API) transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppTransportConfig {
    /// Graph API base URL.
    #[serde(default = "default_graph_url")]
    pub api_url: String,
    /// Graph API version segment.
    #[serde(default = "default_graph_version")]
    pub api_version: String,
    /// Bearer access token.
    #[serde(default)]
    pub access_token: String,
    /// Sending phone number ID.
    #[serde(default)]
    pub phone_number_id: String,
}

impl Default for WhatsAppTransportConfig {
    fn default() -> Self {
        Self {
            api_url: default_graph_url(),
            api_version: default_graph_version(),
            access_token: String::new(),
            phone_number_id: String::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_site_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_digest_days() -> i64 {
    7
}

fn default_digest_cron() -> String {
    // Mondays at 07:00 UTC.
    "0 0 7 * * Mon".to_string()
}

fn default_from_address() -> String {
    "noreply@opptrack.local".to_string()
}

fn default_graph_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_graph_version() -> String {
    "v21.0".to_string()
}
