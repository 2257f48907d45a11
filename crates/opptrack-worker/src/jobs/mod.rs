//! Built-in job handlers.

pub mod digest;
pub mod send;

pub use digest::DigestJobHandler;
pub use send::SendJobHandler;

/// Job type for the scheduled digest trigger.
pub const DIGEST_JOB_TYPE: &str = "notification_digest";
