#![allow(dead_code)]

use async_trait::async_trait;
use netlog_application::ports::{ConnectionLogRepository, DnsLogRepository};
use netlog_domain::{
    ConnectionRecord, DnsRecord, DnsStatus, DomainError, RawConnectionEvent, RawDnsEvent,
    TransportProtocol,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Recording repositories
// ============================================================================

#[derive(Default)]
pub struct RecordingConnectionRepo {
    batches: Mutex<Vec<Vec<ConnectionRecord>>>,
    failures_left: AtomicUsize,
}

impl RecordingConnectionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` inserts fail without storing anything.
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn batches(&self) -> Vec<Vec<ConnectionRecord>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn total(&self) -> usize {
        self.batches.lock().unwrap().iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl ConnectionLogRepository for RecordingConnectionRepo {
    async fn insert_batch(&self, records: &[ConnectionRecord]) -> Result<(), DomainError> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DomainError::DatabaseError("disk I/O error".to_string()));
        }
        self.batches.lock().unwrap().push(records.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingDnsRepo {
    batches: Mutex<Vec<Vec<DnsRecord>>>,
}

impl RecordingDnsRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<Vec<DnsRecord>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn total(&self) -> usize {
        self.batches.lock().unwrap().iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl DnsLogRepository for RecordingDnsRepo {
    async fn insert_batch(&self, records: &[DnsRecord]) -> Result<(), DomainError> {
        self.batches.lock().unwrap().push(records.to_vec());
        Ok(())
    }
}

// ============================================================================
// Event builders
// ============================================================================

pub fn connection_event(conn_id: &str, dest: &str) -> RawConnectionEvent {
    RawConnectionEvent {
        conn_id: Arc::from(conn_id),
        uid: 10_050,
        source: "10.111.222.1:51000".parse().unwrap(),
        destination: dest.parse().unwrap(),
        protocol: TransportProtocol::Udp,
        started_at_ms: 1_700_000_000_000,
        ended_at_ms: Some(1_700_000_001_000),
        bytes_sent: 100,
        bytes_received: 300,
        blocked: false,
        block_rule: None,
        query: None,
    }
}

pub fn dns_event(id: &str, name: &str, answer: &str, status: DnsStatus) -> RawDnsEvent {
    RawDnsEvent {
        id: Arc::from(id),
        query_name: Arc::from(name),
        query_type: 1,
        transport: Default::default(),
        answers: vec![answer.parse().unwrap()],
        rdata: None,
        rcode: 0,
        status,
        query_time_ms: chrono::Utc::now().timestamp_millis() - 25,
        rtt_ms: Some(12),
        upstream: Some("1.1.1.1:53".to_string()),
        relay: None,
        blocklists: None,
    }
}
