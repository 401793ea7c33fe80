use crate::ports::AppRegistry;
use dashmap::DashMap;
use std::sync::Arc;

/// `AppRegistry` backed by a concurrent map that callers keep up to date.
#[derive(Default)]
pub struct InMemoryAppRegistry {
    apps: DashMap<u32, Arc<str>>,
}

impl InMemoryAppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, uid: u32, name: impl Into<Arc<str>>) {
        self.apps.insert(uid, name.into());
    }

    pub fn unregister(&self, uid: u32) {
        self.apps.remove(&uid);
    }
}

impl AppRegistry for InMemoryAppRegistry {
    fn app_name(&self, uid: u32) -> Option<Arc<str>> {
        self.apps.get(&uid).map(|entry| entry.value().clone())
    }
}
