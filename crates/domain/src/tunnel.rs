/// Connectivity signal derived from DNS completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TunnelState {
    /// No query has completed yet
    #[default]
    Unknown,
    /// The last query reaching the network got an answer
    Up,
    /// The last query reaching the network failed on the way to the upstream
    Failing,
}

impl TunnelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TunnelState::Unknown => "unknown",
            TunnelState::Up => "up",
            TunnelState::Failing => "failing",
        }
    }
}
