//! Subscription entities and the resolved subscriber contact row.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::method::DeliveryMethod;

/// A user's subscription to a broadcast channel.
///
/// Soft-disabled via `is_active`; never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationSubscription {
    /// Unique subscription identifier.
    pub id: Uuid,
    /// The subscribed user.
    pub user_id: Uuid,
    /// The channel subscribed to.
    pub channel_id: Uuid,
    /// Whether the subscription currently receives notices.
    pub is_active: bool,
    /// The user's chosen delivery method for this channel.
    pub preferred_method: DeliveryMethod,
}

/// A user's subscription to updates of one specific opportunity.
///
/// Created implicitly when the user opts in via the subscribe toggle;
/// soft-disabled via `is_active`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OpportunitySubscription {
    /// Unique subscription identifier.
    pub id: Uuid,
    /// The subscribed user.
    pub user_id: Uuid,
    /// The opportunity followed.
    pub opportunity_id: Uuid,
    /// Whether the subscription currently receives notices.
    pub is_active: bool,
    /// The user's chosen delivery method for this opportunity.
    pub preferred_method: DeliveryMethod,
}

/// A resolved recipient: user, method, and the address for that method.
///
/// Produced by the subscription repository joining subscriptions against
/// users. `address` is the email address for [`DeliveryMethod::Email`]
/// and the phone number otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SubscriberContact {
    /// The subscribed user.
    pub user_id: Uuid,
    /// The delivery method this user prefers.
    pub preferred_method: DeliveryMethod,
    /// Delivery address for the preferred method.
    pub address: Option<String>,
}

impl SubscriberContact {
    /// Convenience constructor, mainly for tests and fixtures.
    pub fn new(user_id: Uuid, preferred_method: DeliveryMethod, address: Option<&str>) -> Self {
        Self {
            user_id,
            preferred_method,
            address: address.map(str::to_string),
        }
    }
}
