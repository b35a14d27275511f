//! Run deadline watchdog

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

/// Trips the timeout token once the run has lasted `timeout`.
///
/// Only flips the flag; lanes observe it at the top of their loop.
pub struct TimeoutMonitor {
    run_id: Uuid,
    timeout: Duration,
    interval: Duration,
    started_at: Instant,
    tripped: CancellationToken,
    shutdown: CancellationToken,
}

impl TimeoutMonitor {
    pub fn new(
        run_id: Uuid,
        timeout: Duration,
        interval: Duration,
        started_at: Instant,
        tripped: CancellationToken,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            run_id,
            timeout,
            interval,
            started_at,
            tripped,
            shutdown,
        }
    }

    pub fn spawn(self) -> JoinHandle<bool> {
        tokio::spawn(self.run())
    }

    /// Returns `true` if the deadline was reached before shutdown
    pub async fn run(self) -> bool {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    debug!(run_id = %self.run_id, "Timeout monitor stopped");
                    return false;
                }
                _ = ticker.tick() => {
                    let elapsed = self.started_at.elapsed();
                    if elapsed >= self.timeout {
                        if !self.tripped.is_cancelled() {
                            warn!(
                                run_id = %self.run_id,
                                timeout_secs = self.timeout.as_secs_f64(),
                                elapsed_ms = elapsed.as_millis() as u64,
                                "Run deadline reached"
                            );
                            self.tripped.cancel();
                        }
                        return true;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn monitor(timeout_ms: u64) -> (TimeoutMonitor, CancellationToken, CancellationToken) {
        let tripped = CancellationToken::new();
        let shutdown = CancellationToken::new();
        let monitor = TimeoutMonitor::new(
            Uuid::new_v4(),
            Duration::from_millis(timeout_ms),
            Duration::from_millis(10),
            Instant::now(),
            tripped.clone(),
            shutdown.clone(),
        );
        (monitor, tripped, shutdown)
    }

    #[tokio::test(start_paused = true)]
    async fn test_trips_after_deadline() {
        let (monitor, tripped, _shutdown) = monitor(250);
        let handle = monitor.spawn();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!tripped.is_cancelled());

        assert!(handle.await.unwrap());
        assert!(tripped.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_deadline() {
        let (monitor, tripped, shutdown) = monitor(10_000);
        let handle = monitor.spawn();

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();

        assert!(!handle.await.unwrap());
        assert!(!tripped.is_cancelled());
    }
}
