use async_trait::async_trait;
use netlog_domain::{ConnectionRecord, DnsRecord, DomainError};

#[async_trait]
pub trait ConnectionLogRepository: Send + Sync {
    /// Persist records in order. An empty slice is a no-op.
    async fn insert_batch(&self, records: &[ConnectionRecord]) -> Result<(), DomainError>;
}

#[async_trait]
pub trait DnsLogRepository: Send + Sync {
    /// Persist records in order. An empty slice is a no-op.
    async fn insert_batch(&self, records: &[DnsRecord]) -> Result<(), DomainError>;
}
