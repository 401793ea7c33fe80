use super::{multi_row_insert, MAX_ROWS_PER_STATEMENT};
use crate::database::db_error;
use async_trait::async_trait;
use netlog_application::ports::DnsLogRepository;
use netlog_domain::{DnsRecord, DomainError};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

const COLUMNS: &[&str] = &[
    "query_id",
    "query_name",
    "query_type",
    "transport",
    "resolved_ips",
    "rdata",
    "rcode",
    "status",
    "upstream",
    "relay",
    "blocked",
    "blocklists",
    "query_time_ms",
    "response_time_ms",
    "latency_ms",
    "upstream_rtt_ms",
];

pub struct SqliteDnsLogRepository {
    pool: SqlitePool,
}

impl SqliteDnsLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> Result<u64, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM dns_log")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(count as u64)
    }
}

fn join_ips(record: &DnsRecord) -> String {
    record
        .resolved_ips
        .iter()
        .map(|ip| ip.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl DnsLogRepository for SqliteDnsLogRepository {
    #[instrument(skip_all, fields(count = records.len()))]
    async fn insert_batch(&self, records: &[DnsRecord]) -> Result<(), DomainError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(db_error)?;
        for chunk in records.chunks(MAX_ROWS_PER_STATEMENT) {
            let sql = multi_row_insert("dns_log", COLUMNS, chunk.len());
            let mut query = sqlx::query(&sql);
            for r in chunk {
                query = query
                    .bind(&*r.query_id)
                    .bind(&*r.query_name)
                    .bind(r.query_type as i64)
                    .bind(r.transport.as_str())
                    .bind(join_ips(r))
                    .bind(r.rdata.as_deref())
                    .bind(r.rcode as i64)
                    .bind(r.status.as_str())
                    .bind(r.upstream.as_deref())
                    .bind(r.relay.as_deref())
                    .bind(r.blocked)
                    .bind(r.blocklists.as_deref())
                    .bind(r.query_time_ms)
                    .bind(r.response_time_ms)
                    .bind(r.latency_ms as i64)
                    .bind(r.upstream_rtt_ms.map(|v| v as i64));
            }
            query.execute(&mut *tx).await.map_err(db_error)?;
        }
        tx.commit().await.map_err(db_error)?;

        debug!("DNS log rows inserted");
        Ok(())
    }
}
