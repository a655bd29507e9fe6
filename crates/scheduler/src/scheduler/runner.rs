use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::Inner;
use crate::error::SchedulerError;

/// Timer task. Exits when `shutdown` is notified or the scheduler is stopped.
pub(crate) async fn run_loop(inner: Arc<Inner>) {
    let initial_delay = Duration::from_secs(inner.config.initial_delay_secs);
    let interval = Duration::from_secs(inner.config.check_interval_secs.max(1));

    tokio::select! {
        _ = tokio::time::sleep(initial_delay) => {}
        _ = inner.shutdown.notified() => {
            info!("Scheduler loop cancelled before first tick");
            return;
        }
    }

    // First `tick()` completes immediately: that is the post-delay tick.
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = inner.shutdown.notified() => break,
        }
        if inner.stopped.load(Ordering::SeqCst) {
            break;
        }

        match inner.tick(Utc::now()).await {
            Ok(_) => {}
            Err(SchedulerError::Disabled) => debug!("Notifications disabled, tick skipped"),
            Err(SchedulerError::Stopped) => break,
            // Already logged inside the tick; the next interval retries.
            Err(e) => debug!(error = %e, "Tick ended early"),
        }
    }

    info!("Scheduler loop exited");
}
