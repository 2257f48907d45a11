//! Subscription management.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use opptrack_core::result::AppResult;
use opptrack_core::AppError;
use opptrack_database::repositories::{
    OpportunityRepository, SubscriptionRepository, UserRepository,
};
use opptrack_entity::notification::{
    DeliveryMethod, NotificationChannel, NotificationSubscription, OpportunitySubscription,
};

use crate::context::RequestContext;

/// Manages channel and per-opportunity subscriptions.
#[derive(Debug)]
pub struct SubscriptionService {
    subscriptions: Arc<SubscriptionRepository>,
    opportunities: Arc<OpportunityRepository>,
    users: Arc<UserRepository>,
}

impl SubscriptionService {
    /// Create a subscription service.
    pub fn new(
        subscriptions: Arc<SubscriptionRepository>,
        opportunities: Arc<OpportunityRepository>,
        users: Arc<UserRepository>,
    ) -> Self {
        Self {
            subscriptions,
            opportunities,
            users,
        }
    }

    /// Ensure a broadcast channel exists, creating it on first use.
    ///
    /// Called at startup for every channel named in configuration, so a
    /// configured channel is always provisioned before the first save.
    pub async fn ensure_channel(
        &self,
        name: &str,
        description: Option<&str>,
        default_method: DeliveryMethod,
    ) -> AppResult<NotificationChannel> {
        if let Some(channel) = self.subscriptions.find_channel_by_name(name).await? {
            return Ok(channel);
        }
        let channel = self
            .subscriptions
            .create_channel(name, description, default_method)
            .await?;
        info!(channel = name, "broadcast channel provisioned");
        Ok(channel)
    }

    /// Subscribe the caller to a broadcast channel.
    ///
    /// Without an explicit method the channel's default applies.
    pub async fn subscribe_channel(
        &self,
        ctx: &RequestContext,
        channel_name: &str,
        method: Option<DeliveryMethod>,
    ) -> AppResult<NotificationSubscription> {
        let user = self.active_user(ctx.user_id).await?;
        let channel = self
            .subscriptions
            .find_channel_by_name(channel_name)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Channel '{channel_name}' does not exist"))
            })?;

        let method = method.unwrap_or(channel.default_method);
        self.subscriptions
            .subscribe_channel(user.id, channel.id, method)
            .await
    }

    /// Toggle the caller's subscription to one opportunity.
    ///
    /// The first opt-in creates the row; later calls flip `is_active`,
    /// keeping the method chosen at opt-in.
    pub async fn set_opportunity_subscription(
        &self,
        ctx: &RequestContext,
        opportunity_id: Uuid,
        subscribe: bool,
    ) -> AppResult<OpportunitySubscription> {
        let user = self.active_user(ctx.user_id).await?;
        if self
            .opportunities
            .find_by_id(opportunity_id)
            .await?
            .is_none()
        {
            return Err(AppError::not_found(format!(
                "Opportunity {opportunity_id} does not exist"
            )));
        }

        let method = match self
            .subscriptions
            .find_opportunity_subscription(user.id, opportunity_id)
            .await?
        {
            Some(existing) => existing.preferred_method,
            None => default_method_for(user.email.as_deref(), user.phone.as_deref()),
        };

        self.subscriptions
            .set_opportunity_subscription(user.id, opportunity_id, subscribe, method)
            .await
    }

    async fn active_user(&self, user_id: Uuid) -> AppResult<opptrack_entity::user::User> {
        self.users
            .find_active(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {user_id} is not active")))
    }
}

/// Pick the delivery method a first-time subscriber can actually
/// receive: email when an address is on file, otherwise SMS.
fn default_method_for(email: Option<&str>, phone: Option<&str>) -> DeliveryMethod {
    match (email, phone) {
        (Some(e), _) if !e.trim().is_empty() => DeliveryMethod::Email,
        (_, Some(p)) if !p.trim().is_empty() => DeliveryMethod::Sms,
        _ => DeliveryMethod::Email,
    }
}
