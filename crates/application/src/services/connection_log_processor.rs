use netlog_domain::{ConnectionRecord, DomainError, RawConnectionEvent};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::IpDomainCache;
use crate::ports::{AppRegistry, ConnectionLogRepository};

/// Turns raw connection telemetry into `ConnectionRecord`s and hands batches
/// to storage.
///
/// Conversion only touches in-memory lookups (app registry, IP to domain
/// cache), never the repository.
pub struct ConnectionLogProcessor {
    repo: Arc<dyn ConnectionLogRepository>,
    ip_domains: Arc<IpDomainCache>,
    apps: Option<Arc<dyn AppRegistry>>,
}

impl ConnectionLogProcessor {
    pub fn new(
        repo: Arc<dyn ConnectionLogRepository>,
        ip_domains: Arc<IpDomainCache>,
        apps: Option<Arc<dyn AppRegistry>>,
    ) -> Self {
        Self {
            repo,
            ip_domains,
            apps,
        }
    }

    pub fn make_connection_record(
        &self,
        event: RawConnectionEvent,
    ) -> Result<ConnectionRecord, DomainError> {
        if event.conn_id.trim().is_empty() {
            return Err(DomainError::InvalidEvent(
                "connection event without conn_id".to_string(),
            ));
        }
        if event.started_at_ms <= 0 {
            return Err(DomainError::InvalidEvent(format!(
                "connection {} has no start time",
                event.conn_id
            )));
        }

        let duration_ms = match event.ended_at_ms {
            Some(end) if end < event.started_at_ms => {
                return Err(DomainError::InvalidEvent(format!(
                    "connection {} ends before it starts",
                    event.conn_id
                )));
            }
            Some(end) => (end - event.started_at_ms) as u64,
            None => 0,
        };

        let dest_ip = event.destination.ip();
        let dns_query = event
            .query
            .filter(|q| !q.is_empty())
            .or_else(|| self.ip_domains.get(&dest_ip));
        let app_name = self.apps.as_ref().and_then(|apps| apps.app_name(event.uid));

        Ok(ConnectionRecord {
            id: None,
            conn_id: event.conn_id,
            uid: event.uid,
            app_name,
            source_ip: event.source.ip(),
            source_port: event.source.port(),
            dest_ip,
            dest_port: event.destination.port(),
            protocol: event.protocol,
            dns_query,
            blocked: event.blocked,
            block_rule: event.block_rule,
            bytes_sent: event.bytes_sent,
            bytes_received: event.bytes_received,
            duration_ms,
            timestamp_ms: event.started_at_ms,
        })
    }

    #[instrument(skip_all, fields(count = records.len()))]
    pub async fn insert_batch(&self, records: Vec<ConnectionRecord>) -> Result<(), DomainError> {
        self.repo.insert_batch(&records).await?;
        debug!("Connection log batch stored");
        Ok(())
    }
}
