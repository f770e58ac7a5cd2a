//! Real-time driver
//!
//! Steps a shared [`Desktop`] forward by wall-clock time on a tokio
//! interval. Time is measured with `tokio::time::Instant`, so a paused test
//! runtime drives the simulation deterministically.

use crate::desktop::Desktop;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Desktop shared between the driver and its callers
pub type SharedDesktop = Arc<Mutex<Desktop>>;

/// Handle to a running driver
#[derive(Debug)]
pub struct DriverHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DriverHandle {
    /// Check if the driver task has exited
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the driver and wait for it to tear the desktop down
    pub async fn shutdown(self) {
        // the task may already be gone; the join below reports that
        let _ = self.stop.send(true);
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "desktop driver ended abnormally");
        }
    }
}

/// Spawn a task advancing `desktop` every `period` of real time
///
/// Must be called from within a tokio runtime. On shutdown the task calls
/// [`Desktop::shutdown`] before exiting.
#[must_use]
pub fn spawn_driver(desktop: SharedDesktop, period: Duration) -> DriverHandle {
    let period = period.max(Duration::from_millis(1));
    let (stop, mut stopped) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = Instant::now();
        tracing::info!(?period, "desktop driver started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let elapsed = now.saturating_duration_since(last);
                    last = now;
                    if !elapsed.is_zero() {
                        desktop.lock().advance(elapsed);
                    }
                }
                changed = stopped.changed() => {
                    if changed.is_err() || *stopped.borrow() {
                        break;
                    }
                }
            }
        }

        desktop.lock().shutdown();
        tracing::info!("desktop driver stopped");
    });

    DriverHandle { stop, task }
}
