use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Batching cadence shared by the connection and DNS log batchers
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchingConfig {
    /// Items per batch before a size-triggered flush (default: 20)
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Time after the first buffered item before a time-triggered flush (default: 2000)
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Capacity of each batcher's input channel (default: 10000)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Capacity of each processing worker's queue (default: 4096)
    #[serde(default = "default_worker_queue")]
    pub worker_queue: usize,
}

impl BatchingConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            channel_capacity: default_channel_capacity(),
            worker_queue: default_worker_queue(),
        }
    }
}

fn default_max_batch_size() -> usize {
    20
}

fn default_flush_interval_ms() -> u64 {
    2000
}

fn default_channel_capacity() -> usize {
    10_000
}

fn default_worker_queue() -> usize {
    4096
}
