use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tracing::info;

use core_config::database::PostgresConfig;

use crate::common::{RetryConfig, retry, retry_with_backoff};

/// Connect to PostgreSQL and return a sea-orm connection pool.
pub async fn connect(url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    info!("Attempting to connect to PostgreSQL");

    let mut options = ConnectOptions::new(url.to_string());
    options
        .max_connections(max_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let db = Database::connect(options).await?;

    info!("Successfully connected to PostgreSQL");
    Ok(db)
}

/// Connect using a PostgresConfig.
pub async fn connect_from_config(config: &PostgresConfig) -> Result<DatabaseConnection, DbErr> {
    connect(&config.url, config.max_connections).await
}

/// Connect from config with automatic retry on failure.
pub async fn connect_from_config_with_retry(
    config: &PostgresConfig,
    retry_config: Option<RetryConfig>,
) -> Result<DatabaseConnection, DbErr> {
    let config = config.clone();

    match retry_config {
        Some(retry_config) => {
            retry_with_backoff(|| connect_from_config(&config), retry_config).await
        }
        None => retry(|| connect_from_config(&config)).await,
    }
}
