//! Configuration module for NetLog
//!
//! - `root`: Main configuration and CLI overrides
//! - `logging`: Logging settings
//! - `database`: Database configuration
//! - `batching`: Batch size and flush cadence
//! - `netlog`: Ingestion switches and estimator settings
//! - `errors`: Configuration errors

pub mod batching;
pub mod database;
pub mod errors;
pub mod logging;
pub mod netlog;
pub mod root;

pub use batching::BatchingConfig;
pub use database::DatabaseConfig;
pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use netlog::NetLogConfig;
pub use root::{CliOverrides, Config};
