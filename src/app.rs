use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::application::{AuthUseCase, DatasetUseCase};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::connection::init_db;
use crate::infrastructure::db::{SqliteDatasetRepository, SqliteUserRepository};
use crate::interfaces::http::{start_server, HttpState};

/// Load configuration, open storage and serve the API until shutdown.
pub async fn run() -> Result<()> {
    let config = AppConfig::load()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let state = build_state(&config).await?;
    let (server, addr) = start_server(state, &config.host, config.port).map_err(|e| {
        error!(error = %e, host = %config.host, port = config.port, "Failed to bind HTTP server");
        AppError::from(e)
    })?;

    info!(%addr, database_url = %config.database_url, "equiview started");
    server.await?;
    info!("equiview stopped");
    Ok(())
}

pub async fn build_state(config: &AppConfig) -> Result<HttpState> {
    let pool = init_db(&config.database_url).await.map_err(|e| {
        error!(error = %e, database_url = %config.database_url, "Failed to initialize database");
        e
    })?;

    let users = Arc::new(SqliteUserRepository::new(pool.clone()));
    let datasets = Arc::new(SqliteDatasetRepository::new(pool));

    Ok(HttpState {
        auth: Arc::new(AuthUseCase::new(users)),
        datasets: Arc::new(DatasetUseCase::new(
            datasets,
            config.retention_policy()?,
            config.max_upload_bytes,
            config.report_row_limit,
        )),
    })
}
