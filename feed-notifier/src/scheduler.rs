use crate::monitor::FeedMonitor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Runs a poll cycle on a fixed interval after an initial delay.
///
/// The scheduler shares the monitor with manual callers; their cycles
/// serialize on the monitor's state lock, not here.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    interval: Duration,
    initial_delay: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration, initial_delay: Duration) -> Self {
        Self {
            interval,
            initial_delay,
        }
    }

    /// Start the timer task. It exits when `shutdown` flips to `true` or its
    /// sender is dropped.
    pub fn spawn(
        self,
        monitor: Arc<FeedMonitor>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Scheduler started: first check in {:?}, then every {:?}",
                self.initial_delay, self.interval
            );

            let mut ticker = interval_at(Instant::now() + self.initial_delay, self.interval);
            // A cycle that overruns the interval delays the next one instead
            // of triggering a burst.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        info!("Running periodic feed check...");
                        let report = monitor.run_cycle().await;
                        if !report.persisted {
                            warn!("Periodic check could not persist tracking state");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Scheduler stopped");
        })
    }
}
