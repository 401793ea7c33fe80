use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Transport protocol of a tracked connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportProtocol {
    Tcp,
    Udp,
    Icmp,
    /// Anything else, carried as the raw IP protocol number
    Other(u8),
}

impl TransportProtocol {
    pub fn from_number(number: u8) -> Self {
        match number {
            1 | 58 => TransportProtocol::Icmp,
            6 => TransportProtocol::Tcp,
            17 => TransportProtocol::Udp,
            n => TransportProtocol::Other(n),
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            TransportProtocol::Icmp => 1,
            TransportProtocol::Tcp => 6,
            TransportProtocol::Udp => 17,
            TransportProtocol::Other(n) => *n,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportProtocol::Tcp => "tcp",
            TransportProtocol::Udp => "udp",
            TransportProtocol::Icmp => "icmp",
            TransportProtocol::Other(_) => "other",
        }
    }
}

/// Per-connection telemetry as emitted by the packet-processing core.
///
/// Timestamps are milliseconds since the UNIX epoch. `ended_at_ms` is absent
/// for connections that were blocked before any traffic flowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawConnectionEvent {
    pub conn_id: Arc<str>,
    pub uid: u32,
    pub source: SocketAddr,
    pub destination: SocketAddr,
    pub protocol: TransportProtocol,
    pub started_at_ms: i64,
    #[serde(default)]
    pub ended_at_ms: Option<i64>,
    #[serde(default)]
    pub bytes_sent: u64,
    #[serde(default)]
    pub bytes_received: u64,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub block_rule: Option<String>,
    /// Domain the producer already associated with the destination, if any
    #[serde(default)]
    pub query: Option<Arc<str>>,
}

/// Persistable connection log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionRecord {
    pub id: Option<i64>,
    pub conn_id: Arc<str>,
    pub uid: u32,
    pub app_name: Option<Arc<str>>,
    pub source_ip: IpAddr,
    pub source_port: u16,
    pub dest_ip: IpAddr,
    pub dest_port: u16,
    pub protocol: TransportProtocol,
    pub dns_query: Option<Arc<str>>,
    pub blocked: bool,
    pub block_rule: Option<String>,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub duration_ms: u64,
    pub timestamp_ms: i64,
}

impl ConnectionRecord {
    pub fn total_bytes(&self) -> u64 {
        self.bytes_sent.saturating_add(self.bytes_received)
    }
}
