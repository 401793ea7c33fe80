#![allow(dead_code)]

use async_trait::async_trait;
use netlog_application::ports::{
    ConnectivityPublisher, ConnectionLogRepository, DnsLogRepository,
};
use netlog_domain::{
    ConnectionRecord, DnsRecord, DnsStatus, DomainError, RawConnectionEvent, RawDnsEvent,
    TransportProtocol, TunnelState,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock ConnectionLogRepository
// ============================================================================

#[derive(Default)]
pub struct MockConnectionLogRepository {
    batches: Mutex<Vec<Vec<ConnectionRecord>>>,
    should_fail: AtomicBool,
}

impl MockConnectionLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    pub fn batches(&self) -> Vec<Vec<ConnectionRecord>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConnectionLogRepository for MockConnectionLogRepository {
    async fn insert_batch(&self, records: &[ConnectionRecord]) -> Result<(), DomainError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(DomainError::DatabaseError("mock insert failed".to_string()));
        }
        self.batches.lock().unwrap().push(records.to_vec());
        Ok(())
    }
}

// ============================================================================
// Mock DnsLogRepository
// ============================================================================

#[derive(Default)]
pub struct MockDnsLogRepository {
    batches: Mutex<Vec<Vec<DnsRecord>>>,
}

impl MockDnsLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<Vec<DnsRecord>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl DnsLogRepository for MockDnsLogRepository {
    async fn insert_batch(&self, records: &[DnsRecord]) -> Result<(), DomainError> {
        self.batches.lock().unwrap().push(records.to_vec());
        Ok(())
    }
}

// ============================================================================
// Recording ConnectivityPublisher
// ============================================================================

#[derive(Default)]
pub struct RecordingConnectivity {
    published: Mutex<Vec<TunnelState>>,
}

impl RecordingConnectivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<TunnelState> {
        self.published.lock().unwrap().clone()
    }
}

impl ConnectivityPublisher for RecordingConnectivity {
    fn publish(&self, state: TunnelState) {
        self.published.lock().unwrap().push(state);
    }
}

// ============================================================================
// Event builders
// ============================================================================

pub fn connection_event(conn_id: &str, dest: &str) -> RawConnectionEvent {
    RawConnectionEvent {
        conn_id: Arc::from(conn_id),
        uid: 10_123,
        source: "10.111.222.1:40000".parse().unwrap(),
        destination: dest.parse().unwrap(),
        protocol: TransportProtocol::Tcp,
        started_at_ms: 1_700_000_000_000,
        ended_at_ms: Some(1_700_000_000_250),
        bytes_sent: 512,
        bytes_received: 4096,
        blocked: false,
        block_rule: None,
        query: None,
    }
}

pub fn dns_event(id: &str, name: &str, answer: &str) -> RawDnsEvent {
    RawDnsEvent {
        id: Arc::from(id),
        query_name: Arc::from(name),
        query_type: 1,
        transport: Default::default(),
        answers: vec![answer.parse().unwrap()],
        rdata: Some(answer.to_string()),
        rcode: 0,
        status: DnsStatus::Complete,
        query_time_ms: 1_700_000_000_000,
        rtt_ms: Some(20),
        upstream: Some("9.9.9.9:53".to_string()),
        relay: None,
        blocklists: None,
    }
}
