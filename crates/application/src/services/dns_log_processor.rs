use dashmap::DashMap;
use netlog_domain::{
    DnsRecord, DnsStatus, DomainError, RawDnsEvent, Transaction, TransactionState, TunnelState,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::IpDomainCache;
use crate::ports::{ConnectivityPublisher, DnsLogRepository};

/// Running totals of logged DNS requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestCounters {
    pub total: u64,
    pub blocked: u64,
}

/// Tracks DNS transactions from request to response and converts completed
/// ones into `DnsRecord`s.
///
/// In-flight requests live in a short-lived map from query id to request
/// start time; a completion removes the entry, so a reused id always starts
/// fresh.
pub struct DnsLogProcessor {
    repo: Arc<dyn DnsLogRepository>,
    connectivity: Arc<dyn ConnectivityPublisher>,
    ip_domains: Arc<IpDomainCache>,
    pending: DashMap<Arc<str>, i64>,
    pending_capacity: usize,
    pending_max_age_ms: i64,
    total_requests: AtomicU64,
    blocked_requests: AtomicU64,
}

impl DnsLogProcessor {
    pub fn new(
        repo: Arc<dyn DnsLogRepository>,
        connectivity: Arc<dyn ConnectivityPublisher>,
        ip_domains: Arc<IpDomainCache>,
    ) -> Self {
        Self {
            repo,
            connectivity,
            ip_domains,
            pending: DashMap::new(),
            pending_capacity: 4096,
            pending_max_age_ms: 30_000,
            total_requests: AtomicU64::new(0),
            blocked_requests: AtomicU64::new(0),
        }
    }

    pub fn with_pending_limits(mut self, capacity: usize, max_age_ms: i64) -> Self {
        self.pending_capacity = capacity.max(1);
        self.pending_max_age_ms = max_age_ms;
        self
    }

    /// Opens a Pending transaction for a request seen before its response.
    ///
    /// Returns `false` when the start time is not a valid timestamp or the
    /// pending map is full even after dropping stale entries; the eventual
    /// response is then timed from the event itself.
    pub fn track_request(&self, query_id: Arc<str>, started_at_ms: i64) -> bool {
        if started_at_ms <= 0 {
            warn!(query_id = %query_id, started_at_ms, "Ignoring DNS request without start time");
            return false;
        }
        if self.pending.len() >= self.pending_capacity {
            self.sweep_stale(started_at_ms);
            if self.pending.len() >= self.pending_capacity {
                warn!(
                    capacity = self.pending_capacity,
                    query_id = %query_id,
                    "Pending DNS transaction map full, not tracking request"
                );
                return false;
            }
        }
        self.pending.insert(query_id, started_at_ms);
        true
    }

    /// Completes the transaction for `event`.
    ///
    /// A previously tracked request keeps its own start time; otherwise the
    /// event's `query_time_ms` is used and Pending collapses into Completed.
    pub fn process_on_response(
        &self,
        event: RawDnsEvent,
        responded_at_ms: i64,
    ) -> Result<Transaction, DomainError> {
        if event.id.is_empty() || event.query_name.is_empty() {
            return Err(DomainError::InvalidEvent(format!(
                "dns event missing id or query name (id={:?})",
                event.id
            )));
        }
        if event.query_time_ms <= 0 {
            return Err(DomainError::InvalidEvent(format!(
                "dns event {} has no query time",
                event.id
            )));
        }

        let started_at_ms = self
            .pending
            .remove(&event.id)
            .map_or(event.query_time_ms, |(_, started_at_ms)| started_at_ms);

        Ok(Transaction::pending(event, started_at_ms).complete(responded_at_ms))
    }

    pub fn make_dns_record(&self, transaction: &Transaction) -> Result<DnsRecord, DomainError> {
        let TransactionState::Completed {
            started_at_ms,
            responded_at_ms,
        } = transaction.state
        else {
            return Err(DomainError::TransactionIncomplete(
                transaction.query_id.to_string(),
            ));
        };

        for ip in &transaction.answers {
            self.ip_domains.insert(*ip, transaction.query_name.clone());
        }

        Ok(DnsRecord {
            id: None,
            query_id: transaction.query_id.clone(),
            query_name: transaction.query_name.clone(),
            query_type: transaction.query_type,
            transport: transaction.transport,
            resolved_ips: transaction.answers.clone(),
            rdata: transaction.rdata.clone(),
            rcode: transaction.rcode,
            status: transaction.status,
            upstream: transaction.upstream.clone(),
            relay: transaction.relay.clone(),
            blocked: transaction.is_blocked(),
            blocklists: transaction.blocklists.clone(),
            query_time_ms: started_at_ms,
            response_time_ms: responded_at_ms,
            latency_ms: responded_at_ms.saturating_sub(started_at_ms).max(0) as u64,
            upstream_rtt_ms: transaction.rtt_ms,
        })
    }

    pub fn update_dns_request_count(&self, record: &DnsRecord) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if record.blocked {
            self.blocked_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn request_counters(&self) -> RequestCounters {
        RequestCounters {
            total: self.total_requests.load(Ordering::Relaxed),
            blocked: self.blocked_requests.load(Ordering::Relaxed),
        }
    }

    /// Publishes the tunnel state implied by a completed transaction.
    ///
    /// Only outcomes that say something about reachability are published:
    /// an answer means Up, a send/transport/timeout failure means Failing.
    pub fn update_vpn_connection_state(&self, transaction: &Transaction) {
        let state = match transaction.status {
            DnsStatus::Complete => TunnelState::Up,
            status if status.is_network_failure() => TunnelState::Failing,
            _ => return,
        };
        self.connectivity.publish(state);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn sweep_stale(&self, now_ms: i64) {
        let max_age = self.pending_max_age_ms;
        let before = self.pending.len();
        self.pending
            .retain(|_, started_at_ms| now_ms.saturating_sub(*started_at_ms) <= max_age);
        debug!(
            removed = before.saturating_sub(self.pending.len()),
            "Swept stale pending DNS transactions"
        );
    }

    #[instrument(skip_all, fields(count = records.len()))]
    pub async fn insert_batch(&self, records: Vec<DnsRecord>) -> Result<(), DomainError> {
        self.repo.insert_batch(&records).await?;
        debug!("DNS log batch stored");
        Ok(())
    }
}
