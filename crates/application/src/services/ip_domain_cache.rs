use lru::LruCache;
use std::net::IpAddr;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// Bounded association of resolved IPs to the domain that produced them.
///
/// Fed from DNS answers and read when enriching connection records, so a
/// connection to 93.184.216.34 can be shown as example.com.
pub struct IpDomainCache {
    entries: Mutex<LruCache<IpAddr, Arc<str>>>,
}

impl IpDomainCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn insert(&self, ip: IpAddr, domain: Arc<str>) {
        if ip.is_unspecified() {
            return;
        }
        self.lock().put(ip, domain);
    }

    pub fn get(&self, ip: &IpAddr) -> Option<Arc<str>> {
        self.lock().get(ip).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<IpAddr, Arc<str>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
