//! # NetLog
//!
//! Reads connection and DNS telemetry as NDJSON from stdin and persists it
//! through the batching pipeline until EOF or Ctrl+C.

mod bootstrap;

use clap::Parser;
use netlog_application::services::{InMemoryAppRegistry, LoggingSwitch};
use netlog_domain::{CliOverrides, RawConnectionEvent, RawDnsEvent};
use netlog_infrastructure::connectivity::WatchConnectivityPublisher;
use netlog_infrastructure::pipeline::NetLogTracker;
use netlog_infrastructure::repositories::{SqliteConnectionLogRepository, SqliteDnsLogRepository};
use serde::Deserialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "netlog")]
#[command(version)]
#[command(about = "Connection and DNS log ingestion")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short = 'c', long)]
    config: Option<String>,

    /// SQLite database path
    #[arg(short = 'd', long)]
    database: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long)]
    log_level: Option<String>,

    /// Records per flushed batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Maximum time a record waits before being flushed
    #[arg(long)]
    flush_interval_ms: Option<u64>,

    /// Track latency and tunnel state without persisting records
    #[arg(long)]
    no_logs: bool,
}

/// One line of input
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum IngestLine {
    Connection(RawConnectionEvent),
    Dns(RawDnsEvent),
    Request { id: Arc<str>, started_at_ms: i64 },
    App { uid: u32, name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        database_path: cli.database,
        log_level: cli.log_level,
        max_batch_size: cli.batch_size,
        flush_interval_ms: cli.flush_interval_ms,
        logs_enabled: cli.no_logs.then_some(false),
    };
    let config = bootstrap::load_config(cli.config.as_deref(), overrides)?;
    bootstrap::init_logging(&config);

    let pool = bootstrap::init_database(&config.database).await?;
    let connection_repo = Arc::new(SqliteConnectionLogRepository::new(pool.clone()));
    let dns_repo = Arc::new(SqliteDnsLogRepository::new(pool.clone()));
    let connectivity = Arc::new(WatchConnectivityPublisher::new());
    let apps = Arc::new(InMemoryAppRegistry::new());
    let switch = Arc::new(LoggingSwitch::new(config.netlog.logs_enabled));

    let tracker = NetLogTracker::new(
        connection_repo.clone(),
        dns_repo.clone(),
        connectivity.clone(),
        switch,
    )
    .with_batching(config.batching.clone())
    .with_netlog(config.netlog.clone())
    .with_app_registry(apps.clone());

    tracker.start().await;
    info!("Reading NDJSON events from stdin, press Ctrl+C to stop");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut accepted = 0u64;
    let mut rejected = 0u64;
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            info!("End of input");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<IngestLine>(&line) {
            Ok(IngestLine::Connection(event)) => tracker.write_connection_event(event),
            Ok(IngestLine::Dns(event)) => tracker.write_dns_event(event),
            Ok(IngestLine::Request { id, started_at_ms }) => {
                tracker.track_dns_request(id, started_at_ms);
            }
            Ok(IngestLine::App { uid, name }) => apps.register(uid, name),
            Err(e) => {
                rejected += 1;
                warn!(error = %e, "Skipping malformed input line");
                continue;
            }
        }
        accepted += 1;
    }

    tracker.stop().await;

    let latency = tracker.latency();
    let counters = tracker.request_counters();
    info!(
        accepted,
        rejected,
        dns_total = counters.total,
        dns_blocked = counters.blocked,
        stored_connections = connection_repo.count().await?,
        stored_dns = dns_repo.count().await?,
        tunnel = connectivity.current().as_str(),
        "Ingestion finished"
    );
    info!(
        observations = latency.observations,
        mean_ms = latency.mean_ms,
        quantiles = ?latency.quantiles,
        "DNS latency"
    );

    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_connection_line() {
        let line = r#"{"kind":"connection","conn_id":"c1","uid":10050,"source":"10.0.0.2:5000","destination":"1.1.1.1:443","protocol":"tcp","started_at_ms":1700000000000}"#;
        let parsed: IngestLine = serde_json::from_str(line).unwrap();
        assert!(matches!(parsed, IngestLine::Connection(e) if &*e.conn_id == "c1"));
    }

    #[test]
    fn test_parses_app_line() {
        let parsed: IngestLine =
            serde_json::from_str(r#"{"kind":"app","uid":7,"name":"org.example"}"#).unwrap();
        assert!(matches!(parsed, IngestLine::App { uid: 7, .. }));
    }

    #[test]
    fn test_rejects_unknown_kind() {
        assert!(serde_json::from_str::<IngestLine>(r#"{"kind":"other"}"#).is_err());
    }
}
