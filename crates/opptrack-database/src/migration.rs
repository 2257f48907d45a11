//! Schema migrations embedded at compile time.

use sqlx::migrate::Migrator;
use sqlx::PgPool;
use tracing::info;

use opptrack_core::error::{AppError, ErrorKind};
use opptrack_core::result::AppResult;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Bring the schema up to date. Safe to call on every startup; already
/// applied migrations are skipped.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Schema migration failed", e))?;
    info!(
        migrations = MIGRATOR.iter().count(),
        "database schema up to date"
    );
    Ok(())
}
