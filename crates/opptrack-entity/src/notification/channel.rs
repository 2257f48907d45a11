//! Notification channel entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::method::DeliveryMethod;

/// A named broadcast list (e.g. "New Opportunity Alerts").
///
/// Users subscribe to a channel; each subscription carries its own
/// preferred delivery method, with `default_method` used when a new
/// subscription does not specify one.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationChannel {
    /// Unique channel identifier.
    pub id: Uuid,
    /// Unique channel name, referenced from configuration.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Default delivery method for new subscriptions.
    pub default_method: DeliveryMethod,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
