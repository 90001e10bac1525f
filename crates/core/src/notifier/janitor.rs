use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::notifier::ledger::DeliveryLedger;

/// Periodically drops ledger entries older than the freshness threshold. The
/// sweep period equals the threshold.
pub struct Janitor {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Janitor {
    /// Must be called from within a Tokio runtime.
    pub fn spawn(ledger: Arc<DeliveryLedger>, threshold: Duration) -> Self {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + threshold, threshold);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        sweep(&ledger, threshold, Utc::now());
                    }
                }
            }

            debug!(event_name = "notifier.janitor.stopped", "ledger janitor stopped");
        });

        Self { cancel, handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(error) = self.handle.await {
            warn!(
                event_name = "notifier.janitor.join_failed",
                error = %error,
                "ledger janitor did not stop cleanly"
            );
        }
    }
}

pub fn sweep(ledger: &DeliveryLedger, threshold: Duration, now: DateTime<Utc>) -> usize {
    let removed = ledger.prune_older_than(threshold, now);
    debug!(
        event_name = "notifier.janitor.swept",
        removed,
        remaining = ledger.len(),
        "cleaned up processed events"
    );
    removed
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeDelta, Utc};

    use super::{sweep, Janitor};
    use crate::notifier::ledger::DeliveryLedger;

    #[test]
    fn sweep_leaves_no_entry_older_than_threshold() {
        let ledger = DeliveryLedger::new();
        let now = Utc::now();
        ledger.record("Ev1", now - TimeDelta::seconds(300));
        ledger.record("Ev2", now - TimeDelta::seconds(61));
        ledger.record("Ev3", now - TimeDelta::seconds(1));

        let removed = sweep(&ledger, Duration::from_secs(60), now);

        assert_eq!(removed, 2);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.contains("Ev3"));
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_task_prunes_and_stops_on_shutdown() {
        let ledger = Arc::new(DeliveryLedger::new());
        ledger.record("ancient", Utc::now() - TimeDelta::seconds(3_600));

        let janitor = Janitor::spawn(ledger.clone(), Duration::from_secs(60));
        assert!(janitor.is_running());

        tokio::time::sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;
        assert!(ledger.is_empty(), "first tick should prune the stale entry");

        janitor.shutdown().await;
    }
}
