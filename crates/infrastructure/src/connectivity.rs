use netlog_application::ports::ConnectivityPublisher;
use netlog_domain::TunnelState;
use tokio::sync::watch;
use tracing::info;

/// Publishes tunnel state on a `watch` channel.
///
/// Subscribers only wake when the state actually changes.
pub struct WatchConnectivityPublisher {
    sender: watch::Sender<TunnelState>,
}

impl WatchConnectivityPublisher {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(TunnelState::Unknown);
        Self { sender }
    }

    pub fn subscribe(&self) -> watch::Receiver<TunnelState> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> TunnelState {
        *self.sender.borrow()
    }
}

impl Default for WatchConnectivityPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityPublisher for WatchConnectivityPublisher {
    fn publish(&self, state: TunnelState) {
        let changed = self.sender.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        if changed {
            info!(state = state.as_str(), "Tunnel state changed");
        }
    }
}
