use super::{multi_row_insert, MAX_ROWS_PER_STATEMENT};
use crate::database::db_error;
use async_trait::async_trait;
use netlog_application::ports::ConnectionLogRepository;
use netlog_domain::{ConnectionRecord, DomainError};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

const COLUMNS: &[&str] = &[
    "conn_id",
    "uid",
    "app_name",
    "source_ip",
    "source_port",
    "dest_ip",
    "dest_port",
    "protocol",
    "dns_query",
    "blocked",
    "block_rule",
    "bytes_sent",
    "bytes_received",
    "duration_ms",
    "timestamp_ms",
];

pub struct SqliteConnectionLogRepository {
    pool: SqlitePool,
}

impl SqliteConnectionLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> Result<u64, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM connection_log")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(count as u64)
    }
}

#[async_trait]
impl ConnectionLogRepository for SqliteConnectionLogRepository {
    #[instrument(skip_all, fields(count = records.len()))]
    async fn insert_batch(&self, records: &[ConnectionRecord]) -> Result<(), DomainError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(db_error)?;
        for chunk in records.chunks(MAX_ROWS_PER_STATEMENT) {
            let sql = multi_row_insert("connection_log", COLUMNS, chunk.len());
            let mut query = sqlx::query(&sql);
            for r in chunk {
                query = query
                    .bind(&*r.conn_id)
                    .bind(r.uid as i64)
                    .bind(r.app_name.as_deref())
                    .bind(r.source_ip.to_string())
                    .bind(r.source_port as i64)
                    .bind(r.dest_ip.to_string())
                    .bind(r.dest_port as i64)
                    .bind(r.protocol.number() as i64)
                    .bind(r.dns_query.as_deref())
                    .bind(r.blocked)
                    .bind(r.block_rule.as_deref())
                    .bind(r.bytes_sent as i64)
                    .bind(r.bytes_received as i64)
                    .bind(r.duration_ms as i64)
                    .bind(r.timestamp_ms);
            }
            query.execute(&mut *tx).await.map_err(db_error)?;
        }
        tx.commit().await.map_err(db_error)?;

        debug!("Connection log rows inserted");
        Ok(())
    }
}
