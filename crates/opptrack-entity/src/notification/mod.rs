//! Notification domain entities.

pub mod channel;
pub mod method;
pub mod subscription;

pub use channel::NotificationChannel;
pub use method::DeliveryMethod;
pub use subscription::{NotificationSubscription, OpportunitySubscription, SubscriberContact};
