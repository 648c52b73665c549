use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

use crate::config::AppConfig;
use crate::errors::ServiceError;

/// Configuration for the mirror's database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl DbConfig {
    /// `None` when no database URL is configured.
    pub fn from_app(cfg: &AppConfig) -> Option<Self> {
        let url = cfg.database_url.as_ref()?.trim();
        if url.is_empty() {
            return None;
        }
        Some(Self {
            url: url.to_string(),
            max_connections: cfg.db_max_connections,
            connect_timeout: Duration::from_secs(10),
            acquire_timeout: Duration::from_secs(8),
        })
    }
}

/// Opens a connection pool for the `database` mirror backend.
pub async fn connect(config: &DbConfig) -> Result<DatabaseConnection, ServiceError> {
    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    info!(
        max_connections = config.max_connections,
        "mirror database connection established"
    );
    Ok(db)
}
