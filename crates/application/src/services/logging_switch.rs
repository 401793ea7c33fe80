use std::sync::atomic::{AtomicBool, Ordering};

/// Runtime "logs enabled" setting, read on every write call.
#[derive(Debug)]
pub struct LoggingSwitch {
    enabled: AtomicBool,
}

impl LoggingSwitch {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

impl Default for LoggingSwitch {
    fn default() -> Self {
        Self::new(true)
    }
}
