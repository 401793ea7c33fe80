use netlog_domain::TunnelState;

/// Receives tunnel-state updates derived from DNS completions.
///
/// Called on the producer's context, so implementations must not block.
pub trait ConnectivityPublisher: Send + Sync {
    fn publish(&self, state: TunnelState);
}
