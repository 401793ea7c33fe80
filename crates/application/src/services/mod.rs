pub mod app_registry;
pub mod connection_log_processor;
pub mod dns_log_processor;
pub mod ip_domain_cache;
pub mod logging_switch;
pub mod quantile_estimator;

pub use app_registry::InMemoryAppRegistry;
pub use connection_log_processor::ConnectionLogProcessor;
pub use dns_log_processor::{DnsLogProcessor, RequestCounters};
pub use ip_domain_cache::IpDomainCache;
pub use logging_switch::LoggingSwitch;
pub use quantile_estimator::{LatencySnapshot, QuantileEstimator};
