//! # Realty API Main Entry Point

use anyhow::Context;
use realty::{config::ConfigLoader, db, seeds, server::run_server, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Layered env files, then process environment
    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;

    telemetry::init_tracing(&config).context("initializing tracing")?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!("Configuration: {}", redacted_json);
    }
    if config.uses_dev_secret() {
        tracing::warn!("Using the development JWT secret; set REALTY_JWT_SECRET before deploying");
    }

    let pool = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;
    db::run_migrations(&pool).await?;

    if config.seed_catalog {
        seeds::seed_catalog(&pool)
            .await
            .context("seeding property types and characteristics")?;
    }

    run_server(config, pool).await
}
