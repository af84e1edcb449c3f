use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info};

/// Polling state for one mailbox. The cancel flag is shared with the poll
/// loop, which checks it on every tick.
#[derive(Debug)]
pub struct MonitorHandle {
    pub email: String,
    pub started_at: DateTime<Utc>,
    cancelled: Arc<AtomicBool>,
}

impl MonitorHandle {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Registry of active monitors, one per mailbox. Registering a mailbox that
/// already has a monitor cancels the old one first, so the invariant "at most
/// one active monitor per mailbox" holds across retries and restarts.
#[derive(Debug, Default)]
pub struct MonitorRegistry {
    monitors: DashMap<String, MonitorHandle>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin monitoring `email`; returns the cancel flag the poll loop must
    /// watch.
    pub fn begin(&self, email: &str, started_at: DateTime<Utc>) -> Arc<AtomicBool> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let handle = MonitorHandle {
            email: email.to_string(),
            started_at,
            cancelled: cancelled.clone(),
        };
        if let Some(previous) = self.monitors.insert(email.to_string(), handle) {
            debug!(email, "replacing active monitor");
            previous.cancel();
        }
        info!(email, active = self.monitors.len(), "monitor started");
        cancelled
    }

    /// Remove the monitor for `email`, but only if it is still the one that
    /// owns `flag` — a replacement registered meanwhile stays untouched.
    pub fn finish(&self, email: &str, flag: &Arc<AtomicBool>) {
        self.monitors
            .remove_if(email, |_, handle| Arc::ptr_eq(&handle.cancelled, flag));
    }

    /// Cancel and drop the monitor for `email`. No-op when none is active.
    pub fn stop(&self, email: &str) {
        if let Some((_, handle)) = self.monitors.remove(email) {
            handle.cancel();
            info!(email, "monitor stopped");
        }
    }

    /// Cancel and drop every active monitor.
    pub fn stop_all(&self) {
        for entry in self.monitors.iter() {
            entry.value().cancel();
        }
        self.monitors.clear();
        info!("all monitors stopped");
    }

    pub fn active(&self) -> usize {
        self.monitors.len()
    }
}
