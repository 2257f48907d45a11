//! User entity model.
//!
//! Authentication and session handling live outside this system; the user
//! table exists so that opportunities can reference owners and so that the
//! dispatcher can resolve delivery addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An application user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Login name.
    pub username: String,
    /// Display name.
    pub full_name: Option<String>,
    /// Email address, required for email delivery.
    pub email: Option<String>,
    /// Phone number, required for SMS/WhatsApp delivery.
    pub phone: Option<String>,
    /// Whether the account is active.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Display label: full name when present, username otherwise.
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_username() {
        let user = User {
            id: Uuid::new_v4(),
            username: "jdoe".to_string(),
            full_name: None,
            email: None,
            phone: None,
            is_active: true,
            created_at: Utc::now(),
        };
        assert_eq!(user.display_name(), "jdoe");
    }
}
