pub mod batcher;
pub mod net_log_tracker;

pub use batcher::{BatchStats, EventBatcher};
pub use net_log_tracker::NetLogTracker;
