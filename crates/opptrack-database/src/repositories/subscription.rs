//! Channel and subscription repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use opptrack_core::error::{AppError, ErrorKind};
use opptrack_core::result::AppResult;
use opptrack_entity::notification::{
    DeliveryMethod, NotificationChannel, NotificationSubscription, OpportunitySubscription,
    SubscriberContact,
};

/// Repository for notification channels and both subscription kinds.
#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    /// Create a new subscription repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a broadcast channel by its unique name.
    pub async fn find_channel_by_name(&self, name: &str) -> AppResult<Option<NotificationChannel>> {
        sqlx::query_as::<_, NotificationChannel>(
            "SELECT * FROM notification_channels WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find channel", e))
    }

    /// Create a broadcast channel.
    pub async fn create_channel(
        &self,
        name: &str,
        description: Option<&str>,
        default_method: DeliveryMethod,
    ) -> AppResult<NotificationChannel> {
        sqlx::query_as::<_, NotificationChannel>(
            "INSERT INTO notification_channels (name, description, default_method) \
             VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(name)
        .bind(description)
        .bind(default_method)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                AppError::conflict(format!("Channel '{name}' already exists"))
            } else {
                AppError::with_source(ErrorKind::Database, "Failed to create channel", e)
            }
        })
    }

    /// Resolved contacts of all active subscribers to a channel.
    ///
    /// The address column is the user's email for the email method and
    /// the phone number otherwise; rows may carry a NULL address when the
    /// user record lacks the needed field.
    pub async fn channel_subscriber_contacts(
        &self,
        channel_id: Uuid,
    ) -> AppResult<Vec<SubscriberContact>> {
        sqlx::query_as::<_, SubscriberContact>(
            "SELECT s.user_id, s.preferred_method, \
             CASE WHEN s.preferred_method = 'email' THEN u.email ELSE u.phone END AS address \
             FROM notification_subscriptions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.channel_id = $1 AND s.is_active AND u.is_active",
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to resolve channel subscribers", e)
        })
    }

    /// Resolved contacts of all active subscribers to one opportunity.
    pub async fn opportunity_subscriber_contacts(
        &self,
        opportunity_id: Uuid,
    ) -> AppResult<Vec<SubscriberContact>> {
        sqlx::query_as::<_, SubscriberContact>(
            "SELECT s.user_id, s.preferred_method, \
             CASE WHEN s.preferred_method = 'email' THEN u.email ELSE u.phone END AS address \
             FROM opportunity_subscriptions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.opportunity_id = $1 AND s.is_active AND u.is_active",
        )
        .bind(opportunity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                "Failed to resolve opportunity subscribers",
                e,
            )
        })
    }

    /// Subscribe a user to a broadcast channel (idempotent upsert).
    pub async fn subscribe_channel(
        &self,
        user_id: Uuid,
        channel_id: Uuid,
        preferred_method: DeliveryMethod,
    ) -> AppResult<NotificationSubscription> {
        sqlx::query_as::<_, NotificationSubscription>(
            "INSERT INTO notification_subscriptions (user_id, channel_id, is_active, preferred_method) \
             VALUES ($1, $2, TRUE, $3) \
             ON CONFLICT (user_id, channel_id) \
             DO UPDATE SET is_active = TRUE, preferred_method = EXCLUDED.preferred_method \
             RETURNING *",
        )
        .bind(user_id)
        .bind(channel_id)
        .bind(preferred_method)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to subscribe", e))
    }

    /// A user's subscription to one opportunity, if any (active or not).
    pub async fn find_opportunity_subscription(
        &self,
        user_id: Uuid,
        opportunity_id: Uuid,
    ) -> AppResult<Option<OpportunitySubscription>> {
        sqlx::query_as::<_, OpportunitySubscription>(
            "SELECT * FROM opportunity_subscriptions \
             WHERE user_id = $1 AND opportunity_id = $2",
        )
        .bind(user_id)
        .bind(opportunity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find subscription", e))
    }

    /// Set the active flag on a per-opportunity subscription, creating the
    /// row on first opt-in. Rows are soft-disabled, never deleted.
    pub async fn set_opportunity_subscription(
        &self,
        user_id: Uuid,
        opportunity_id: Uuid,
        is_active: bool,
        preferred_method: DeliveryMethod,
    ) -> AppResult<OpportunitySubscription> {
        sqlx::query_as::<_, OpportunitySubscription>(
            "INSERT INTO opportunity_subscriptions (user_id, opportunity_id, is_active, preferred_method) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, opportunity_id) \
             DO UPDATE SET is_active = EXCLUDED.is_active \
             RETURNING *",
        )
        .bind(user_id)
        .bind(opportunity_id)
        .bind(is_active)
        .bind(preferred_method)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to toggle subscription", e))
    }
}
