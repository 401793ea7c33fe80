use netlog_domain::Transaction;
use std::sync::Mutex;
use tracing::trace;

const MARKERS: usize = 5;

/// Single-quantile P² estimator (Jain & Chlamtac).
///
/// Keeps five marker heights and positions; each observation adjusts the
/// three middle markers by at most one position, so updates are O(1) and
/// memory never grows.
#[derive(Debug, Clone)]
struct P2Quantile {
    p: f64,
    count: u64,
    heights: [f64; MARKERS],
    positions: [f64; MARKERS],
    desired: [f64; MARKERS],
    increments: [f64; MARKERS],
}

impl P2Quantile {
    fn new(p: f64) -> Self {
        Self {
            p,
            count: 0,
            heights: [0.0; MARKERS],
            positions: [0.0, 1.0, 2.0, 3.0, 4.0],
            desired: [0.0, 2.0 * p, 4.0 * p, 2.0 + 2.0 * p, 4.0],
            increments: [0.0, p / 2.0, p, (1.0 + p) / 2.0, 1.0],
        }
    }

    fn observe(&mut self, x: f64) {
        if self.count < MARKERS as u64 {
            self.heights[self.count as usize] = x;
            self.count += 1;
            if self.count == MARKERS as u64 {
                self.heights.sort_by(f64::total_cmp);
            }
            return;
        }
        self.count += 1;

        let q = &mut self.heights;
        let k = if x < q[0] {
            q[0] = x;
            0
        } else if x >= q[4] {
            q[4] = x;
            3
        } else {
            (1..MARKERS).find(|&i| x < q[i]).map_or(3, |i| i - 1)
        };

        for n in &mut self.positions[k + 1..] {
            *n += 1.0;
        }
        for (np, dn) in self.desired.iter_mut().zip(self.increments) {
            *np += dn;
        }

        for i in 1..MARKERS - 1 {
            let n = &self.positions;
            let d = self.desired[i] - n[i];
            if (d >= 1.0 && n[i + 1] - n[i] > 1.0) || (d <= -1.0 && n[i - 1] - n[i] < -1.0) {
                let d = d.signum();
                let candidate = self.parabolic(i, d);
                self.heights[i] = if self.heights[i - 1] < candidate
                    && candidate < self.heights[i + 1]
                {
                    candidate
                } else {
                    self.linear(i, d)
                };
                self.positions[i] += d;
            }
        }
    }

    fn parabolic(&self, i: usize, d: f64) -> f64 {
        let (q, n) = (&self.heights, &self.positions);
        q[i] + d / (n[i + 1] - n[i - 1])
            * ((n[i] - n[i - 1] + d) * (q[i + 1] - q[i]) / (n[i + 1] - n[i])
                + (n[i + 1] - n[i] - d) * (q[i] - q[i - 1]) / (n[i] - n[i - 1]))
    }

    fn linear(&self, i: usize, d: f64) -> f64 {
        let j = if d > 0.0 { i + 1 } else { i - 1 };
        let (q, n) = (&self.heights, &self.positions);
        q[i] + d * (q[j] - q[i]) / (n[j] - n[i])
    }

    fn estimate(&self) -> Option<f64> {
        match self.count {
            0 => None,
            c if c >= MARKERS as u64 => Some(self.heights[2]),
            c => {
                // Bootstrap: nearest rank over the few samples seen so far.
                let mut seen = self.heights;
                let seen = &mut seen[..c as usize];
                seen.sort_by(f64::total_cmp);
                let rank = (self.p * (seen.len() - 1) as f64).round() as usize;
                Some(seen[rank.min(seen.len() - 1)])
            }
        }
    }
}

/// Point-in-time view of the latency estimator
#[derive(Debug, Clone, PartialEq)]
pub struct LatencySnapshot {
    pub observations: u64,
    pub mean_ms: f64,
    /// `(p, estimate_ms)` for every tracked quantile that has data
    pub quantiles: Vec<(f64, f64)>,
}

impl LatencySnapshot {
    pub fn quantile(&self, p: f64) -> Option<f64> {
        self.quantiles
            .iter()
            .find(|(q, _)| (q - p).abs() < f64::EPSILON)
            .map(|(_, v)| *v)
    }
}

#[derive(Debug)]
struct EstimatorState {
    markers: Vec<P2Quantile>,
    observations: u64,
    sum_ms: f64,
    ignored: u64,
}

/// Streaming DNS latency percentiles, updated once per completed query.
#[derive(Debug)]
pub struct QuantileEstimator {
    state: Mutex<EstimatorState>,
}

impl QuantileEstimator {
    pub fn new(quantiles: &[f64]) -> Self {
        let markers = quantiles
            .iter()
            .copied()
            .filter(|p| *p > 0.0 && *p < 1.0)
            .map(P2Quantile::new)
            .collect();
        Self {
            state: Mutex::new(EstimatorState {
                markers,
                observations: 0,
                sum_ms: 0.0,
                ignored: 0,
            }),
        }
    }

    /// Records the latency of a completed transaction. Pending ones are ignored.
    pub fn record_transaction(&self, transaction: &Transaction) {
        if let Some(latency) = transaction.latency_ms() {
            self.record_latency(latency);
        }
    }

    /// Negative latencies (clock skew between request and response stamps) are dropped.
    pub fn record_latency(&self, latency_ms: i64) {
        let mut state = self.lock();
        if latency_ms < 0 {
            state.ignored += 1;
            trace!(latency_ms, "Ignoring negative latency observation");
            return;
        }
        let x = latency_ms as f64;
        state.observations += 1;
        state.sum_ms += x;
        for marker in &mut state.markers {
            marker.observe(x);
        }
    }

    /// Current estimate for `p`, or `None` if `p` is not tracked or nothing was recorded.
    pub fn current_quantile(&self, p: f64) -> Option<f64> {
        self.lock()
            .markers
            .iter()
            .find(|m| (m.p - p).abs() < f64::EPSILON)
            .and_then(P2Quantile::estimate)
    }

    pub fn snapshot(&self) -> LatencySnapshot {
        let state = self.lock();
        let mean_ms = if state.observations == 0 {
            0.0
        } else {
            state.sum_ms / state.observations as f64
        };
        LatencySnapshot {
            observations: state.observations,
            mean_ms,
            quantiles: state
                .markers
                .iter()
                .filter_map(|m| m.estimate().map(|v| (m.p, v)))
                .collect(),
        }
    }

    pub fn ignored(&self) -> u64 {
        self.lock().ignored
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EstimatorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for QuantileEstimator {
    fn default() -> Self {
        Self::new(&[0.5, 0.9, 0.99])
    }
}
