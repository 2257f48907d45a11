//! Opportunity file attachment entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A file attached to an opportunity.
///
/// `storage_path` is relative to the configured upload root. Deleting the
/// record must also remove the file from disk; the attachment repository
/// owns that invariant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OpportunityFile {
    /// Unique attachment identifier.
    pub id: Uuid,
    /// The opportunity this file belongs to.
    pub opportunity_id: Uuid,
    /// Original file name.
    pub file_name: String,
    /// Path relative to the upload root.
    pub storage_path: String,
    /// MIME type, when known.
    pub content_type: Option<String>,
    /// File size in bytes.
    pub size_bytes: i64,
    /// User who uploaded the file.
    pub uploaded_by: Option<Uuid>,
    /// Upload timestamp.
    pub created_at: DateTime<Utc>,
}

/// Replace every character outside `[A-Za-z0-9]` with `_`.
///
/// Used to turn a reference number into a safe on-disk folder name.
pub fn sanitize_ref_no(ref_no: &str) -> String {
    ref_no
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_ref_no() {
        assert_eq!(sanitize_ref_no("OPP/2026-001 v2"), "OPP_2026_001_v2");
        assert_eq!(sanitize_ref_no("plain123"), "plain123");
        assert_eq!(sanitize_ref_no("ünïcode"), "_n_code");
    }
}
