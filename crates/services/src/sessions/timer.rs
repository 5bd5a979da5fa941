use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Drives the once-per-second countdown for an in-progress attempt.
///
/// One spawned task emits one message per period over a capacity-1 channel,
/// so at most one tick is ever in flight; a slow consumer stalls the sender
/// and missed periods are skipped, never bursted. Dropping the ticker aborts
/// the task, so arming a ticker for a new attempt cancels the previous one
/// structurally. The caller drops it on submission or view teardown.
pub struct SessionTicker {
    handle: JoinHandle<()>,
    ticks: mpsc::Receiver<()>,
}

impl SessionTicker {
    /// Starts a one-second ticker. Must be called from within a tokio
    /// runtime.
    #[must_use]
    pub fn start() -> Self {
        Self::with_period(Duration::from_secs(1))
    }

    /// Starts a ticker with a custom period.
    #[must_use]
    pub fn with_period(period: Duration) -> Self {
        let (tx, ticks) = mpsc::channel(1);
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first interval fire is immediate; swallow it so the first
            // delivered tick marks one elapsed period.
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        });
        Self { handle, ticks }
    }

    /// Waits for the next tick.
    ///
    /// Returns `None` if the ticker task has stopped.
    pub async fn next_tick(&mut self) -> Option<()> {
        self.ticks.recv().await
    }
}

impl Drop for SessionTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
