//! # opptrack-entity
//!
//! Domain entity models and enums for OppTrack: opportunities and their
//! attachments, users, notification channels and subscriptions, and
//! background jobs. All models are `serde`-serializable and derive
//! `sqlx::FromRow` for direct use by the repository layer.

pub mod job;
pub mod notification;
pub mod opportunity;
pub mod user;

pub use notification::DeliveryMethod;
pub use opportunity::{Opportunity, OpportunityStatus, OppType};
pub use user::User;
