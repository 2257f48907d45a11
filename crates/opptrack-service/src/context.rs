//! Per-request caller context.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identity of the user performing a service operation.
///
/// Passed explicitly into every mutating service call; services never
/// reach for ambient authentication state.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The acting user.
    pub user_id: Uuid,
    /// Username, used in log lines.
    pub username: String,
    /// When the request entered the service layer.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Build a context for the given user.
    pub fn new(user_id: Uuid, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            request_time: Utc::now(),
        }
    }
}
