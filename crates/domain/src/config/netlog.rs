use serde::{Deserialize, Serialize};

/// Ingestion switches and in-memory tracker sizes
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetLogConfig {
    /// Initial value of the runtime logging switch (default: true)
    #[serde(default = "default_true")]
    pub logs_enabled: bool,

    /// Latency quantiles tracked by the estimator (default: [0.5, 0.9, 0.99])
    #[serde(default = "default_quantiles")]
    pub quantiles: Vec<f64>,

    /// Maximum in-flight DNS transactions awaiting a response (default: 4096)
    #[serde(default = "default_pending_capacity")]
    pub pending_capacity: usize,

    /// Pending transactions older than this are discarded (default: 30000)
    #[serde(default = "default_pending_max_age_ms")]
    pub pending_max_age_ms: i64,

    /// Entries kept in the IP to domain association cache (default: 2048)
    #[serde(default = "default_ip_cache_capacity")]
    pub ip_cache_capacity: usize,
}

impl Default for NetLogConfig {
    fn default() -> Self {
        Self {
            logs_enabled: true,
            quantiles: default_quantiles(),
            pending_capacity: default_pending_capacity(),
            pending_max_age_ms: default_pending_max_age_ms(),
            ip_cache_capacity: default_ip_cache_capacity(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_quantiles() -> Vec<f64> {
    vec![0.5, 0.9, 0.99]
}

fn default_pending_capacity() -> usize {
    4096
}

fn default_pending_max_age_ms() -> i64 {
    30_000
}

fn default_ip_cache_capacity() -> usize {
    2048
}
