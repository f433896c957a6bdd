//! Shared maintenance tick
//!
//! One task drives pings, idle eviction and rate-limit window resets for all
//! clients instead of a timer per connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use super::manager::SseManager;

/// Counters from one maintenance sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub timed_out: usize,
    pub send_failures: usize,
    pub windows_reset: usize,
    pub pings_sent: usize,
    pub failed_attempts_pruned: usize,
}

/// Running maintenance task; aborted when dropped
pub struct MaintenanceHandle {
    task: JoinHandle<()>,
}

impl MaintenanceHandle {
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for MaintenanceHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl SseManager {
    /// Run [`SseManager::run_maintenance`] every `cleanup_interval`.
    ///
    /// The task holds a weak reference and exits once the manager is dropped.
    pub fn spawn_maintenance(self: &Arc<Self>) -> MaintenanceHandle {
        let manager = Arc::downgrade(self);
        let period = self.config().cleanup_interval.max(Duration::from_millis(10));

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    debug!("manager dropped, stopping maintenance");
                    break;
                };
                manager.run_maintenance();
            }
        });

        MaintenanceHandle { task }
    }
}
