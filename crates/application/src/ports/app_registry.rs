use std::sync::Arc;

/// In-memory lookup from a connection's owning uid to an app label.
pub trait AppRegistry: Send + Sync {
    fn app_name(&self, uid: u32) -> Option<Arc<str>>;
}
