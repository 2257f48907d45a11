//! Opportunity file attachments.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use opptrack_core::error::{AppError, ErrorKind};
use opptrack_core::result::AppResult;
use opptrack_database::repositories::{AttachmentRepository, OpportunityRepository};
use opptrack_entity::opportunity::{sanitize_ref_no, OpportunityFile};

use crate::context::RequestContext;

/// Stores and removes files attached to opportunities.
///
/// Files land under the upload root in a per-opportunity directory named
/// after the sanitized reference number; the database row carries the
/// relative path.
#[derive(Debug)]
pub struct AttachmentService {
    attachments: Arc<AttachmentRepository>,
    opportunities: Arc<OpportunityRepository>,
}

impl AttachmentService {
    /// Create an attachment service.
    pub fn new(
        attachments: Arc<AttachmentRepository>,
        opportunities: Arc<OpportunityRepository>,
    ) -> Self {
        Self {
            attachments,
            opportunities,
        }
    }

    /// Attach a file to an opportunity.
    pub async fn store(
        &self,
        ctx: &RequestContext,
        opportunity_id: Uuid,
        file_name: &str,
        content_type: Option<String>,
        bytes: &[u8],
    ) -> AppResult<OpportunityFile> {
        if file_name.trim().is_empty() || file_name.contains(['/', '\\']) {
            return Err(AppError::validation(format!(
                "Invalid file name: '{file_name}'"
            )));
        }
        let opp = self
            .opportunities
            .find_by_id(opportunity_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Opportunity {opportunity_id} does not exist"))
            })?;

        let record = OpportunityFile {
            id: Uuid::new_v4(),
            opportunity_id,
            file_name: file_name.to_string(),
            storage_path: format!(
                "opportunities/{}/{file_name}",
                sanitize_ref_no(&opp.ref_no)
            ),
            content_type,
            size_bytes: bytes.len() as i64,
            uploaded_by: Some(ctx.user_id),
            created_at: Utc::now(),
        };

        let target = self.attachments.absolute_path(&record);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to create upload directory", e)
            })?;
        }
        tokio::fs::write(&target, bytes).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to write attachment", e)
        })?;

        self.attachments.create(&record).await?;
        info!(
            opportunity_id = %opportunity_id,
            file = file_name,
            size = record.size_bytes,
            user = %ctx.username,
            "attachment stored"
        );
        Ok(record)
    }

    /// List the attachments of one opportunity.
    pub async fn list(&self, opportunity_id: Uuid) -> AppResult<Vec<OpportunityFile>> {
        self.attachments.find_by_opportunity(opportunity_id).await
    }

    /// Remove an attachment record and its stored file.
    pub async fn remove(&self, ctx: &RequestContext, attachment_id: Uuid) -> AppResult<bool> {
        let removed = self.attachments.delete(attachment_id).await?;
        if removed {
            info!(attachment_id = %attachment_id, user = %ctx.username, "attachment removed");
        }
        Ok(removed)
    }
}
