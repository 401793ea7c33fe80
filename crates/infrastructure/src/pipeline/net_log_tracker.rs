use super::batcher::{BatchStats, EventBatcher};
use arc_swap::ArcSwapOption;
use netlog_application::ports::{
    AppRegistry, ConnectionLogRepository, ConnectivityPublisher, DnsLogRepository,
};
use netlog_application::services::{
    ConnectionLogProcessor, DnsLogProcessor, IpDomainCache, LatencySnapshot, LoggingSwitch,
    QuantileEstimator, RequestCounters,
};
use netlog_domain::config::{BatchingConfig, NetLogConfig};
use netlog_domain::{ConnectionRecord, DnsRecord, RawConnectionEvent, RawDnsEvent, Transaction};
use std::sync::{Arc, OnceLock};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Everything that exists only between `start()` and `stop()`.
struct Pipeline {
    /// Cancels the processing workers; they finish already-accepted events
    workers: CancellationToken,
    /// Cancels the batchers' flush loops once the workers are done
    flush: CancellationToken,
    tasks: TaskTracker,
    connection_tx: mpsc::Sender<RawConnectionEvent>,
    dns_tx: mpsc::Sender<Transaction>,
    connection_batcher: Arc<EventBatcher<ConnectionRecord>>,
    dns_batcher: Arc<EventBatcher<DnsRecord>>,
}

/// Entry point for connection and DNS telemetry.
///
/// Producers call `write_connection_event` / `write_dns_event` from any
/// context; neither call awaits or touches storage. Each stream has one
/// worker fed by a bounded queue that converts events and adds the records
/// to that stream's `EventBatcher`, so records keep submission order inside
/// every flushed batch.
///
/// DNS transaction tracking, latency estimation and the tunnel-state signal
/// run on the caller's context regardless of the logging switch; only
/// persistence is gated by it.
///
/// ## Lifecycle
///
/// ```rust,ignore
/// let tracker = NetLogTracker::new(conn_repo, dns_repo, connectivity, switch);
/// tracker.start().await;
/// tracker.write_dns_event(summary);
/// tracker.stop().await; // final flush of both batchers
/// ```
pub struct NetLogTracker {
    connection_repo: Arc<dyn ConnectionLogRepository>,
    dns_repo: Arc<dyn DnsLogRepository>,
    connectivity: Arc<dyn ConnectivityPublisher>,
    apps: Option<Arc<dyn AppRegistry>>,
    logging: Arc<LoggingSwitch>,
    latency: Arc<QuantileEstimator>,
    ip_domains: Arc<IpDomainCache>,
    batching: BatchingConfig,
    netlog: NetLogConfig,
    connection_processor: OnceLock<Arc<ConnectionLogProcessor>>,
    dns_processor: OnceLock<Arc<DnsLogProcessor>>,
    pipeline: ArcSwapOption<Pipeline>,
    lifecycle: Mutex<()>,
}

impl NetLogTracker {
    pub fn new(
        connection_repo: Arc<dyn ConnectionLogRepository>,
        dns_repo: Arc<dyn DnsLogRepository>,
        connectivity: Arc<dyn ConnectivityPublisher>,
        logging: Arc<LoggingSwitch>,
    ) -> Self {
        let netlog = NetLogConfig::default();
        Self {
            connection_repo,
            dns_repo,
            connectivity,
            apps: None,
            logging,
            latency: Arc::new(QuantileEstimator::new(&netlog.quantiles)),
            ip_domains: Arc::new(IpDomainCache::new(netlog.ip_cache_capacity)),
            batching: BatchingConfig::default(),
            netlog,
            connection_processor: OnceLock::new(),
            dns_processor: OnceLock::new(),
            pipeline: ArcSwapOption::empty(),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn with_batching(mut self, batching: BatchingConfig) -> Self {
        self.batching = batching;
        self
    }

    pub fn with_netlog(mut self, netlog: NetLogConfig) -> Self {
        self.latency = Arc::new(QuantileEstimator::new(&netlog.quantiles));
        self.ip_domains = Arc::new(IpDomainCache::new(netlog.ip_cache_capacity));
        self.netlog = netlog;
        self
    }

    pub fn with_app_registry(mut self, apps: Arc<dyn AppRegistry>) -> Self {
        self.apps = Some(apps);
        self
    }

    /// Starts both batchers and workers. A no-op when already running.
    pub async fn start(&self) {
        let _guard = self.lifecycle.lock().await;
        if self.pipeline.load().is_some() {
            debug!("NetLogTracker already started");
            return;
        }

        let connection_processor = self
            .connection_processor
            .get_or_init(|| {
                Arc::new(ConnectionLogProcessor::new(
                    self.connection_repo.clone(),
                    self.ip_domains.clone(),
                    self.apps.clone(),
                ))
            })
            .clone();
        let dns_processor = self
            .dns_processor
            .get_or_init(|| {
                Arc::new(
                    DnsLogProcessor::new(
                        self.dns_repo.clone(),
                        self.connectivity.clone(),
                        self.ip_domains.clone(),
                    )
                    .with_pending_limits(
                        self.netlog.pending_capacity,
                        self.netlog.pending_max_age_ms,
                    ),
                )
            })
            .clone();

        let workers = CancellationToken::new();
        let flush = CancellationToken::new();
        let tasks = TaskTracker::new();

        let connection_batcher = Arc::new(EventBatcher::new(
            "connection_log",
            &self.batching,
            flush.clone(),
            {
                let processor = connection_processor.clone();
                move |batch: Vec<ConnectionRecord>| {
                    let processor = processor.clone();
                    async move { processor.insert_batch(batch).await }
                }
            },
        ));
        let dns_batcher = Arc::new(EventBatcher::new(
            "dns_log",
            &self.batching,
            flush.clone(),
            {
                let processor = dns_processor.clone();
                move |batch: Vec<DnsRecord>| {
                    let processor = processor.clone();
                    async move { processor.insert_batch(batch).await }
                }
            },
        ));

        let (connection_tx, connection_rx) = mpsc::channel(self.batching.worker_queue.max(1));
        let (dns_tx, dns_rx) = mpsc::channel(self.batching.worker_queue.max(1));

        {
            let batcher = connection_batcher.clone();
            let processor = connection_processor;
            tasks.spawn(run_worker(
                "connection_log",
                connection_rx,
                workers.clone(),
                move |event: RawConnectionEvent| {
                    match processor.make_connection_record(event) {
                        Ok(record) => {
                            batcher.add(record);
                        }
                        Err(e) => warn!(error = %e, "Dropping connection event"),
                    }
                },
            ));
        }
        {
            let batcher = dns_batcher.clone();
            let processor = dns_processor;
            tasks.spawn(run_worker(
                "dns_log",
                dns_rx,
                workers.clone(),
                move |transaction: Transaction| match processor.make_dns_record(&transaction) {
                    Ok(record) => {
                        processor.update_dns_request_count(&record);
                        batcher.add(record);
                    }
                    Err(e) => warn!(
                        error = %e,
                        query_id = %transaction.query_id,
                        "Dropping DNS transaction"
                    ),
                },
            ));
        }
        tasks.close();

        self.pipeline.store(Some(Arc::new(Pipeline {
            workers,
            flush,
            tasks,
            connection_tx,
            dns_tx,
            connection_batcher,
            dns_batcher,
        })));

        info!(
            batch_size = self.batching.max_batch_size,
            flush_interval_ms = self.batching.flush_interval_ms,
            "NetLogTracker started"
        );
    }

    /// Stops intake, lets the workers finish what they accepted, then makes
    /// the final flush of both batchers. Safe to call repeatedly or before
    /// `start()`.
    pub async fn stop(&self) {
        let _guard = self.lifecycle.lock().await;
        let Some(pipeline) = self.pipeline.swap(None) else {
            debug!("NetLogTracker not running, nothing to stop");
            return;
        };

        pipeline.workers.cancel();
        pipeline.tasks.wait().await;

        pipeline.flush.cancel();
        pipeline.connection_batcher.join().await;
        pipeline.dns_batcher.join().await;

        info!(
            connection = ?pipeline.connection_batcher.stats(),
            dns = ?pipeline.dns_batcher.stats(),
            "NetLogTracker stopped"
        );
    }

    pub fn is_running(&self) -> bool {
        self.pipeline.load().is_some()
    }

    /// Queues a connection event for persistence. Dropped when logging is
    /// off, the tracker is stopped or the worker queue is full.
    pub fn write_connection_event(&self, event: RawConnectionEvent) {
        if !self.logging.is_enabled() {
            return;
        }
        let guard = self.pipeline.load();
        let Some(pipeline) = &*guard else {
            debug!("NetLogTracker not running, dropping connection event");
            return;
        };
        enqueue("connection_log", &pipeline.workers, &pipeline.connection_tx, event);
    }

    /// Opens a Pending DNS transaction for producers that see the request
    /// before its summary. Returns `false` if the request is not tracked.
    pub fn track_dns_request(&self, query_id: Arc<str>, started_at_ms: i64) -> bool {
        let Some(processor) = self.dns_processor.get() else {
            debug!("NetLogTracker not started, not tracking DNS request");
            return false;
        };
        processor.track_request(query_id, started_at_ms)
    }

    /// Completes the DNS transaction, updates latency and tunnel state, and
    /// queues the record for persistence when logging is on.
    pub fn write_dns_event(&self, event: RawDnsEvent) {
        let Some(processor) = self.dns_processor.get() else {
            debug!("NetLogTracker not started, dropping DNS event");
            return;
        };

        let responded_at_ms = chrono::Utc::now().timestamp_millis();
        let transaction = match processor.process_on_response(event, responded_at_ms) {
            Ok(transaction) => transaction,
            Err(e) => {
                warn!(error = %e, "Dropping DNS event");
                return;
            }
        };

        self.latency.record_transaction(&transaction);
        processor.update_vpn_connection_state(&transaction);

        if !self.logging.is_enabled() {
            return;
        }
        let guard = self.pipeline.load();
        let Some(pipeline) = &*guard else {
            debug!("NetLogTracker not running, not persisting DNS event");
            return;
        };
        enqueue("dns_log", &pipeline.workers, &pipeline.dns_tx, transaction);
    }

    pub fn logging_switch(&self) -> &Arc<LoggingSwitch> {
        &self.logging
    }

    pub fn latency(&self) -> LatencySnapshot {
        self.latency.snapshot()
    }

    pub fn latency_quantile(&self, p: f64) -> Option<f64> {
        self.latency.current_quantile(p)
    }

    pub fn request_counters(&self) -> RequestCounters {
        self.dns_processor
            .get()
            .map(|p| p.request_counters())
            .unwrap_or_default()
    }

    /// `(connection, dns)` batcher counters while running
    pub fn batch_stats(&self) -> Option<(BatchStats, BatchStats)> {
        self.pipeline
            .load_full()
            .map(|p| (p.connection_batcher.stats(), p.dns_batcher.stats()))
    }
}

fn enqueue<E>(
    stream: &'static str,
    workers: &CancellationToken,
    tx: &mpsc::Sender<E>,
    event: E,
) {
    if workers.is_cancelled() {
        debug!(stream, "NetLogTracker stopping, dropping event");
        return;
    }
    match tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!(stream, "Worker queue full, dropping event");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!(stream, "Worker stopped, dropping event");
        }
    }
}

/// Handles events one at a time until cancelled, then drains what was
/// already queued so accepted events still reach the batcher.
async fn run_worker<E, H>(
    stream: &'static str,
    mut rx: mpsc::Receiver<E>,
    shutdown: CancellationToken,
    handle: H,
) where
    H: Fn(E),
{
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            event = rx.recv() => match event {
                Some(event) => handle(event),
                None => break,
            },
        }
    }

    rx.close();
    let mut drained = 0usize;
    while let Ok(event) = rx.try_recv() {
        handle(event);
        drained += 1;
    }
    debug!(stream, drained, "Worker shut down");
}
