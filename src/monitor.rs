use crate::sync::DashboardManager;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Cancellable periodic refresh. The first tick fires immediately.
pub struct PollingMonitor {
    pub is_monitoring: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Default for PollingMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl PollingMonitor {
    pub fn new() -> Self {
        Self {
            is_monitoring: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_monitoring.load(Ordering::Acquire)
    }

    /// Spawns the poll loop on the current runtime. Returns `false` if already running.
    pub fn start(&self, manager: DashboardManager, period: Duration) -> bool {
        if self
            .is_monitoring
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("[MONITOR] Already running");
            return false;
        }

        let is_monitoring = self.is_monitoring.clone();
        let task = tokio::spawn(async move {
            info!("[MONITOR] Polling every {}s", period.as_secs_f64());
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            while is_monitoring.load(Ordering::Acquire) {
                interval.tick().await;
                if !is_monitoring.load(Ordering::Acquire) {
                    break;
                }
                // Polls run inside this task so `stop()` cancels them too; ticks missed
                // while a poll runs are skipped by the interval.
                let outcome = manager.poll_once().await;
                debug!("[MONITOR] Poll finished: {}", outcome_label(&outcome));
            }
            debug!("[MONITOR] Poll loop exited");
        });

        match self.handle.lock() {
            Ok(mut handle) => *handle = Some(task),
            Err(poisoned) => *poisoned.into_inner() = Some(task),
        }
        true
    }

    /// Stops the loop and cancels the poll in flight, if any. A cancelled poll renders nothing.
    pub fn stop(&self) {
        if !self.is_monitoring.swap(false, Ordering::AcqRel) {
            return;
        }
        let task = match self.handle.lock() {
            Ok(mut handle) => handle.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match task {
            Some(task) => task.abort(),
            None => warn!("[MONITOR] Stop requested but no task handle was stored"),
        }
        info!("[MONITOR] Polling stopped");
    }
}

fn outcome_label(outcome: &crate::sync::RefreshOutcome) -> &'static str {
    use crate::sync::RefreshOutcome::*;
    match outcome {
        Rendered(_) | RenderedLogs(_) => "rendered",
        Failed(_) => "failed",
        Superseded => "superseded",
        Skipped => "skipped",
    }
}
