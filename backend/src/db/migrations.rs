use anyhow::{Context, Result};
use sqlx::{PgPool, migrate::Migrator};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Creates or upgrades the `documents` table.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("document store migration failed")?;
    tracing::info!(known = MIGRATOR.iter().count(), "document store schema is up to date");
    Ok(())
}
