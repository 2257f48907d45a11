//! Concrete repository implementations.
//!
//! Each repository is a thin struct over a [`sqlx::PgPool`]; services
//! receive them via `Arc` at construction time.

pub mod attachment;
pub mod job;
pub mod opportunity;
pub mod subscription;
pub mod user;

pub use attachment::AttachmentRepository;
pub use job::JobRepository;
pub use opportunity::OpportunityRepository;
pub use subscription::SubscriptionRepository;
pub use user::UserRepository;
