use netlog_domain::config::DatabaseConfig;
use netlog_domain::DomainError;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Opens the log database and applies the embedded migrations.
pub async fn create_pool(cfg: &DatabaseConfig) -> Result<SqlitePool, DomainError> {
    let url = cfg.url();
    let options = SqliteConnectOptions::from_str(&url)
        .map_err(db_error)?
        .create_if_missing(true)
        // WAL mode: batch inserts don't block readers
        .journal_mode(SqliteJournalMode::Wal)
        // NORMAL sync is safe with WAL
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(cfg.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await
        .map_err(db_error)?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| DomainError::DatabaseError(format!("migration failed: {e}")))?;

    info!(url = %url, max_connections = cfg.max_connections, "Log database ready");
    Ok(pool)
}

pub(crate) fn db_error(e: sqlx::Error) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}
