use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;

/// Transport the DNS core used to reach the upstream resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DnsTransport {
    #[default]
    Udp,
    Tcp,
    Doh,
    Dot,
    Dnscrypt,
    Doq,
}

impl DnsTransport {
    pub fn as_str(&self) -> &'static str {
        match self {
            DnsTransport::Udp => "udp",
            DnsTransport::Tcp => "tcp",
            DnsTransport::Doh => "doh",
            DnsTransport::Dot => "dot",
            DnsTransport::Dnscrypt => "dnscrypt",
            DnsTransport::Doq => "doq",
        }
    }
}

/// Outcome reported by the DNS core for a single query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DnsStatus {
    #[default]
    Complete,
    SendFailed,
    NoResponse,
    TransportError,
    BadQuery,
    BadResponse,
    InternalError,
}

impl DnsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DnsStatus::Complete => "complete",
            DnsStatus::SendFailed => "send_failed",
            DnsStatus::NoResponse => "no_response",
            DnsStatus::TransportError => "transport_error",
            DnsStatus::BadQuery => "bad_query",
            DnsStatus::BadResponse => "bad_response",
            DnsStatus::InternalError => "internal_error",
        }
    }

    /// Failures that say something about the path to the upstream.
    ///
    /// A malformed query from an app is not evidence that the tunnel is down.
    pub fn is_network_failure(&self) -> bool {
        matches!(
            self,
            DnsStatus::SendFailed | DnsStatus::NoResponse | DnsStatus::TransportError
        )
    }
}

/// Per-query telemetry ("summary") emitted by the DNS core once a query finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDnsEvent {
    /// Query identifier, unique among in-flight queries
    pub id: Arc<str>,
    pub query_name: Arc<str>,
    #[serde(default = "default_query_type")]
    pub query_type: u16,
    #[serde(default)]
    pub transport: DnsTransport,
    #[serde(default)]
    pub answers: Vec<IpAddr>,
    #[serde(default)]
    pub rdata: Option<String>,
    #[serde(default)]
    pub rcode: u16,
    #[serde(default)]
    pub status: DnsStatus,
    /// When the request was observed (ms since UNIX epoch)
    pub query_time_ms: i64,
    /// Round trip to the upstream as measured by the DNS core
    #[serde(default)]
    pub rtt_ms: Option<u64>,
    #[serde(default)]
    pub upstream: Option<String>,
    #[serde(default)]
    pub relay: Option<String>,
    /// Comma separated blocklist names that matched, if any
    #[serde(default)]
    pub blocklists: Option<String>,
}

fn default_query_type() -> u16 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Pending { started_at_ms: i64 },
    Completed { started_at_ms: i64, responded_at_ms: i64 },
}

/// A DNS query between request and response observation.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub query_id: Arc<str>,
    pub query_name: Arc<str>,
    pub query_type: u16,
    pub transport: DnsTransport,
    pub answers: Vec<IpAddr>,
    pub rdata: Option<String>,
    pub rcode: u16,
    pub status: DnsStatus,
    pub rtt_ms: Option<u64>,
    pub upstream: Option<String>,
    pub relay: Option<String>,
    pub blocklists: Option<String>,
    pub state: TransactionState,
}

impl Transaction {
    pub fn pending(event: RawDnsEvent, started_at_ms: i64) -> Self {
        Self {
            query_id: event.id,
            query_name: event.query_name,
            query_type: event.query_type,
            transport: event.transport,
            answers: event.answers,
            rdata: event.rdata,
            rcode: event.rcode,
            status: event.status,
            rtt_ms: event.rtt_ms,
            upstream: event.upstream,
            relay: event.relay,
            blocklists: event.blocklists,
            state: TransactionState::Pending { started_at_ms },
        }
    }

    /// Attaches the response timestamp. Completing twice keeps the first response.
    pub fn complete(mut self, responded_at_ms: i64) -> Self {
        if let TransactionState::Pending { started_at_ms } = self.state {
            self.state = TransactionState::Completed {
                started_at_ms,
                responded_at_ms,
            };
        }
        self
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, TransactionState::Completed { .. })
    }

    pub fn started_at_ms(&self) -> i64 {
        match self.state {
            TransactionState::Pending { started_at_ms }
            | TransactionState::Completed { started_at_ms, .. } => started_at_ms,
        }
    }

    /// Wall-clock latency between request and response; `None` while pending.
    pub fn latency_ms(&self) -> Option<i64> {
        match self.state {
            TransactionState::Pending { .. } => None,
            TransactionState::Completed {
                started_at_ms,
                responded_at_ms,
            } => Some(responded_at_ms.saturating_sub(started_at_ms)),
        }
    }

    pub fn is_blocked(&self) -> bool {
        let listed = self
            .blocklists
            .as_deref()
            .is_some_and(|lists| !lists.trim().is_empty());
        let sinkholed =
            !self.answers.is_empty() && self.answers.iter().all(|ip| ip.is_unspecified());
        listed || sinkholed
    }
}

/// Persistable DNS log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct DnsRecord {
    pub id: Option<i64>,
    pub query_id: Arc<str>,
    pub query_name: Arc<str>,
    pub query_type: u16,
    pub transport: DnsTransport,
    pub resolved_ips: Vec<IpAddr>,
    pub rdata: Option<String>,
    pub rcode: u16,
    pub status: DnsStatus,
    pub upstream: Option<String>,
    pub relay: Option<String>,
    pub blocked: bool,
    pub blocklists: Option<String>,
    pub query_time_ms: i64,
    pub response_time_ms: i64,
    pub latency_ms: u64,
    pub upstream_rtt_ms: Option<u64>,
}
