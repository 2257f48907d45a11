//! Background job domain entities.

pub mod model;
pub mod status;

pub use model::{CreateJob, Job, NOTIFICATION_QUEUE};
pub use status::{JobPriority, JobStatus};
