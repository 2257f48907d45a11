//! Attachment repository implementation.
//!
//! Owns the no-orphaned-files invariant: deleting an attachment record
//! also removes the file from disk.

use std::path::{Path, PathBuf};

use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use opptrack_core::error::{AppError, ErrorKind};
use opptrack_core::result::AppResult;
use opptrack_entity::opportunity::OpportunityFile;

/// Repository for opportunity file attachments.
#[derive(Debug, Clone)]
pub struct AttachmentRepository {
    pool: PgPool,
    upload_root: PathBuf,
}

impl AttachmentRepository {
    /// Create a new attachment repository rooted at `upload_root`.
    pub fn new(pool: PgPool, upload_root: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            upload_root: upload_root.into(),
        }
    }

    /// Absolute path of a stored attachment.
    pub fn absolute_path(&self, attachment: &OpportunityFile) -> PathBuf {
        self.upload_root.join(&attachment.storage_path)
    }

    /// Find an attachment by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<OpportunityFile>> {
        sqlx::query_as::<_, OpportunityFile>("SELECT * FROM opportunity_files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find attachment", e))
    }

    /// List attachments of one opportunity.
    pub async fn find_by_opportunity(
        &self,
        opportunity_id: Uuid,
    ) -> AppResult<Vec<OpportunityFile>> {
        sqlx::query_as::<_, OpportunityFile>(
            "SELECT * FROM opportunity_files WHERE opportunity_id = $1 ORDER BY created_at",
        )
        .bind(opportunity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list attachments", e))
    }

    /// Record an attachment after its file has been written to disk.
    pub async fn create(&self, attachment: &OpportunityFile) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO opportunity_files \
             (id, opportunity_id, file_name, storage_path, content_type, size_bytes, uploaded_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(attachment.id)
        .bind(attachment.opportunity_id)
        .bind(&attachment.file_name)
        .bind(&attachment.storage_path)
        .bind(&attachment.content_type)
        .bind(attachment.size_bytes)
        .bind(attachment.uploaded_by)
        .bind(attachment.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record attachment", e))?;
        Ok(())
    }

    /// Delete an attachment record and its file from disk.
    ///
    /// The record is removed first; a file that then fails to unlink is
    /// logged and retried opportunistically rather than resurrecting the
    /// record. A file already missing from disk is not an error.
    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let Some(attachment) = self.find_by_id(id).await? else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM opportunity_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete attachment", e))?;

        let path = self.absolute_path(&attachment);
        if let Err(e) = remove_file_if_exists(&path).await {
            warn!(path = %path.display(), error = %e, "Attachment file could not be removed");
        }

        Ok(true)
    }
}

async fn remove_file_if_exists(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
