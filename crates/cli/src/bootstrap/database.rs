use netlog_domain::config::DatabaseConfig;
use netlog_infrastructure::database::create_pool;
use sqlx::SqlitePool;
use tracing::{error, info};

pub async fn init_database(cfg: &DatabaseConfig) -> anyhow::Result<SqlitePool> {
    info!("Initializing database: {}", cfg.path);

    let pool = create_pool(cfg).await.map_err(|e| {
        error!("Failed to initialize log database: {}", e);
        anyhow::anyhow!(e)
    })?;

    Ok(pool)
}
