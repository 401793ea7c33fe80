use netlog_domain::config::BatchingConfig;
use netlog_domain::DomainError;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Counters for one batcher, readable while it runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub items_added: u64,
    pub items_dropped: u64,
    pub items_flushed: u64,
    pub batches_flushed: u64,
    pub batches_failed: u64,
}

#[derive(Default)]
struct Counters {
    items_added: AtomicU64,
    items_dropped: AtomicU64,
    items_flushed: AtomicU64,
    batches_flushed: AtomicU64,
    batches_failed: AtomicU64,
}

/// Accumulates items from any number of producers and hands them to a
/// flush function in insertion order.
///
/// One background flush loop per instance owns the batch. A batch is
/// flushed when it reaches `max_batch_size` items or when `flush_interval`
/// has passed since its first item, whichever comes first. An empty batch
/// never flushes.
///
/// ## Concurrency
///
/// `add()` never awaits: items go through a bounded channel into the loop,
/// so each item lands in exactly one batch. When the channel is full the
/// item is dropped and counted.
///
/// ## Shutdown
///
/// Cancelling the token passed to `new()` stops intake. The loop closes
/// its channel, drains everything already accepted, makes a final flush
/// and exits. `join()` waits for that to finish.
///
/// ## Failures
///
/// A failed flush is logged and counted; the batch is discarded and not
/// retried. Later batches are unaffected.
pub struct EventBatcher<T> {
    name: &'static str,
    sender: mpsc::Sender<T>,
    shutdown: CancellationToken,
    counters: Arc<Counters>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> EventBatcher<T> {
    /// Spawns the flush loop on the current tokio runtime.
    pub fn new<F, Fut>(
        name: &'static str,
        config: &BatchingConfig,
        shutdown: CancellationToken,
        flush: F,
    ) -> Self
    where
        F: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DomainError>> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(config.channel_capacity.max(1));
        let counters = Arc::new(Counters::default());

        let flush_loop = FlushLoop {
            name,
            max_batch_size: config.max_batch_size.max(1),
            flush_interval: config.flush_interval(),
            counters: counters.clone(),
            flush,
        };
        let handle = tokio::spawn(flush_loop.run(receiver, shutdown.clone()));

        info!(
            batcher = name,
            batch_size = config.max_batch_size,
            flush_interval_ms = config.flush_interval_ms,
            channel_capacity = config.channel_capacity,
            "Event batcher started"
        );

        Self {
            name,
            sender,
            shutdown,
            counters,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Queues `item` for the current batch.
    ///
    /// Returns `false` if the item was dropped because shutdown has begun or
    /// the channel is full.
    pub fn add(&self, item: T) -> bool {
        if self.shutdown.is_cancelled() {
            self.counters.items_dropped.fetch_add(1, Ordering::Relaxed);
            debug!(batcher = self.name, "Batcher shutting down, dropping item");
            return false;
        }

        match self.sender.try_send(item) {
            Ok(()) => {
                self.counters.items_added.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.counters.items_dropped.fetch_add(1, Ordering::Relaxed);
                warn!(batcher = self.name, "Batcher channel full, dropping item");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.counters.items_dropped.fetch_add(1, Ordering::Relaxed);
                debug!(batcher = self.name, "Batcher closed, dropping item");
                false
            }
        }
    }

    /// Waits for the flush loop to exit. Returns at once on later calls.
    pub async fn join(&self) {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(batcher = self.name, error = %e, "Batcher flush loop panicked");
            }
        }
    }

    pub fn stats(&self) -> BatchStats {
        let c = &self.counters;
        BatchStats {
            items_added: c.items_added.load(Ordering::Relaxed),
            items_dropped: c.items_dropped.load(Ordering::Relaxed),
            items_flushed: c.items_flushed.load(Ordering::Relaxed),
            batches_flushed: c.batches_flushed.load(Ordering::Relaxed),
            batches_failed: c.batches_failed.load(Ordering::Relaxed),
        }
    }
}

struct FlushLoop<F> {
    name: &'static str,
    max_batch_size: usize,
    flush_interval: Duration,
    counters: Arc<Counters>,
    flush: F,
}

impl<F> FlushLoop<F> {
    async fn run<T, Fut>(self, mut receiver: mpsc::Receiver<T>, shutdown: CancellationToken)
    where
        F: Fn(Vec<T>) -> Fut,
        Fut: Future<Output = Result<(), DomainError>>,
    {
        let mut batch: Vec<T> = Vec::with_capacity(self.max_batch_size);
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                maybe_item = receiver.recv() => {
                    match maybe_item {
                        Some(item) => {
                            if batch.is_empty() {
                                deadline = Some(Instant::now() + self.flush_interval);
                            }
                            batch.push(item);
                            if batch.len() >= self.max_batch_size {
                                self.flush_batch(&mut batch).await;
                                deadline = None;
                            }
                        }
                        None => break,
                    }
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.flush_batch(&mut batch).await;
                    deadline = None;
                }
            }
        }

        receiver.close();
        while let Ok(item) = receiver.try_recv() {
            batch.push(item);
            if batch.len() >= self.max_batch_size {
                self.flush_batch(&mut batch).await;
            }
        }
        self.flush_batch(&mut batch).await;

        info!(
            batcher = self.name,
            batches_flushed = self.counters.batches_flushed.load(Ordering::Relaxed),
            items_flushed = self.counters.items_flushed.load(Ordering::Relaxed),
            "Event batcher shut down"
        );
    }

    async fn flush_batch<T, Fut>(&self, batch: &mut Vec<T>)
    where
        F: Fn(Vec<T>) -> Fut,
        Fut: Future<Output = Result<(), DomainError>>,
    {
        if batch.is_empty() {
            return;
        }
        let items = std::mem::replace(batch, Vec::with_capacity(self.max_batch_size));
        let count = items.len();

        match (self.flush)(items).await {
            Ok(()) => {
                self.counters.batches_flushed.fetch_add(1, Ordering::Relaxed);
                self.counters
                    .items_flushed
                    .fetch_add(count as u64, Ordering::Relaxed);
                debug!(batcher = self.name, count, "Batch flushed");
            }
            Err(e) => {
                self.counters.batches_failed.fetch_add(1, Ordering::Relaxed);
                error!(batcher = self.name, error = %e, count, "Failed to flush batch, discarding");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    type Flushed = Arc<StdMutex<Vec<Vec<u32>>>>;

    fn config(max_batch_size: usize, flush_interval_ms: u64) -> BatchingConfig {
        BatchingConfig {
            max_batch_size,
            flush_interval_ms,
            ..BatchingConfig::default()
        }
    }

    fn recording_batcher(
        cfg: &BatchingConfig,
        shutdown: CancellationToken,
    ) -> (EventBatcher<u32>, Flushed) {
        let flushed: Flushed = Arc::new(StdMutex::new(Vec::new()));
        let sink = flushed.clone();
        let batcher = EventBatcher::new("test", cfg, shutdown, move |batch: Vec<u32>| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push(batch);
                Ok(())
            }
        });
        (batcher, flushed)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_size_then_time_trigger() {
        let shutdown = CancellationToken::new();
        let (batcher, flushed) = recording_batcher(&config(5, 2000), shutdown.clone());

        for i in 0..7 {
            assert!(batcher.add(i));
        }
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(*flushed.lock().unwrap(), vec![vec![0, 1, 2, 3, 4]]);

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(
            *flushed.lock().unwrap(),
            vec![vec![0, 1, 2, 3, 4], vec![5, 6]]
        );

        shutdown.cancel();
        batcher.join().await;
        assert_eq!(flushed.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_trigger_waits_full_interval() {
        let shutdown = CancellationToken::new();
        let (batcher, flushed) = recording_batcher(&config(100, 2000), shutdown.clone());

        batcher.add(1);
        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert!(flushed.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*flushed.lock().unwrap(), vec![vec![1]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_batcher_never_flushes() {
        let shutdown = CancellationToken::new();
        let (batcher, flushed) = recording_batcher(&config(5, 100), shutdown.clone());

        batcher.add(1);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(flushed.lock().unwrap().len(), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(flushed.lock().unwrap().len(), 1);
        assert_eq!(batcher.stats().batches_flushed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_flushes_buffered_items_once() {
        let shutdown = CancellationToken::new();
        let (batcher, flushed) = recording_batcher(&config(10, 2000), shutdown.clone());

        for i in 0..3 {
            batcher.add(i);
        }
        settle().await;
        shutdown.cancel();
        batcher.join().await;
        batcher.join().await;

        assert_eq!(*flushed.lock().unwrap(), vec![vec![0, 1, 2]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drains_items_not_yet_received() {
        let shutdown = CancellationToken::new();
        let (batcher, flushed) = recording_batcher(&config(2, 2000), shutdown.clone());

        for i in 0..5 {
            batcher.add(i);
        }
        shutdown.cancel();
        batcher.join().await;

        let batches = flushed.lock().unwrap().clone();
        let all: Vec<u32> = batches.iter().flatten().copied().collect();
        assert_eq!(all, vec![0, 1, 2, 3, 4]);
        assert!(batches.iter().all(|b| b.len() <= 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_after_cancel_rejected() {
        let shutdown = CancellationToken::new();
        let (batcher, flushed) = recording_batcher(&config(10, 2000), shutdown.clone());

        shutdown.cancel();
        assert!(!batcher.add(42));
        batcher.join().await;

        assert!(flushed.lock().unwrap().is_empty());
        let stats = batcher.stats();
        assert_eq!(stats.items_dropped, 1);
        assert_eq!(stats.items_added, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_channel_drops_item() {
        let shutdown = CancellationToken::new();
        let cfg = BatchingConfig {
            channel_capacity: 1,
            ..config(10, 2000)
        };
        let (batcher, _flushed) = recording_batcher(&cfg, shutdown.clone());

        assert!(batcher.add(1));
        assert!(!batcher.add(2));
        assert_eq!(batcher.stats().items_dropped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_flush_is_counted_and_not_retried() {
        let shutdown = CancellationToken::new();
        let attempts = Arc::new(AtomicU64::new(0));
        let seen = attempts.clone();
        let batcher = EventBatcher::new(
            "failing",
            &config(2, 2000),
            shutdown.clone(),
            move |_batch: Vec<u32>| {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Err(DomainError::DatabaseError("disk full".to_string()))
                }
            },
        );

        for i in 0..4 {
            batcher.add(i);
        }
        shutdown.cancel();
        batcher.join().await;

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        let stats = batcher.stats();
        assert_eq!(stats.batches_failed, 2);
        assert_eq!(stats.batches_flushed, 0);
        assert_eq!(stats.items_flushed, 0);
    }

    #[tokio::test]
    async fn test_concurrent_producers_no_loss_or_duplication() {
        let shutdown = CancellationToken::new();
        let (batcher, flushed) = recording_batcher(&config(7, 50), shutdown.clone());
        let batcher = Arc::new(batcher);

        let mut producers = Vec::new();
        for p in 0..8u32 {
            let batcher = batcher.clone();
            producers.push(tokio::spawn(async move {
                for i in 0..100u32 {
                    assert!(batcher.add(p * 1000 + i));
                    if i % 10 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }
        shutdown.cancel();
        batcher.join().await;

        let batches = flushed.lock().unwrap().clone();
        assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= 7));
        assert!(batches.len() >= 800 / 7);

        let mut all: Vec<u32> = batches.iter().flatten().copied().collect();
        assert_eq!(all.len(), 800);
        // per-producer submission order survives batching
        for p in 0..8u32 {
            let mine: Vec<u32> = all.iter().copied().filter(|v| v / 1000 == p).collect();
            assert!(mine.windows(2).all(|w| w[0] < w[1]));
        }
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 800);
    }
}
