//! Opportunity save event passed from the persistence hook to the dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emitted after an opportunity row has been written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunitySaved {
    /// The opportunity that was written.
    pub opportunity_id: Uuid,
    /// The reference number at save time (for message rendering).
    pub ref_no: String,
    /// The title at save time (for message rendering).
    pub title: Option<String>,
    /// Whether the write was an insert (`true`) or an update (`false`).
    pub was_created: bool,
    /// The user who performed the save, when known.
    pub actor_id: Option<Uuid>,
    /// When the event was emitted.
    pub occurred_at: DateTime<Utc>,
}

impl OpportunitySaved {
    /// Build a save event for the given record.
    pub fn new(
        opportunity_id: Uuid,
        ref_no: impl Into<String>,
        title: Option<String>,
        was_created: bool,
        actor_id: Option<Uuid>,
    ) -> Self {
        Self {
            opportunity_id,
            ref_no: ref_no.into(),
            title,
            was_created,
            actor_id,
            occurred_at: Utc::now(),
        }
    }

    /// Display title for message bodies: the title, or the ref number
    /// when no title was recorded.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.ref_no)
    }
}
