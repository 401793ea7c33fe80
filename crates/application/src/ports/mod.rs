mod app_registry;
mod connectivity;
mod log_repositories;

pub use app_registry::AppRegistry;
pub use connectivity::ConnectivityPublisher;
pub use log_repositories::{ConnectionLogRepository, DnsLogRepository};
