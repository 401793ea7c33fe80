//! NetLog Domain Layer
pub mod config;
pub mod connection;
pub mod dns_log;
pub mod errors;
pub mod tunnel;

pub use config::{CliOverrides, Config, ConfigError};
pub use connection::{ConnectionRecord, RawConnectionEvent, TransportProtocol};
pub use dns_log::{
    DnsRecord, DnsStatus, DnsTransport, RawDnsEvent, Transaction, TransactionState,
};
pub use errors::DomainError;
pub use tunnel::TunnelState;
