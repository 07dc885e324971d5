use std::time::Duration;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::AppConfig;

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .context("connect to database")?;
    tracing::info!(max_connections = config.max_connections, "database pool ready");
    Ok(pool)
}

/// Applies `./migrations` unless the deployment manages its schema elsewhere.
pub async fn migrate(pool: &PgPool, config: &AppConfig) -> anyhow::Result<()> {
    if config.skip_migrate {
        tracing::info!("skipping database migration (SKIP_MIGRATE=true)");
        return Ok(());
    }
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("run migrations")?;
    tracing::info!("migrations applied");
    Ok(())
}
