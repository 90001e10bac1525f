use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::domain::EmojiLifecycleEvent;
use crate::errors::NotifyError;
use crate::notifier::engine::{NotificationEngine, NotifyOutcome};
use crate::notifier::ledger::DeliveryLedger;
use crate::notifier::ports::LifecycleSink;
use crate::notifier::staleness::{Freshness, StalenessFilter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineOutcome {
    Dropped(Freshness),
    DuplicateDelivery,
    Handled(NotifyOutcome),
}

/// Staleness filter, delivery ledger and notification engine, in that order.
pub struct EmojiPipeline {
    filter: StalenessFilter,
    ledger: Arc<DeliveryLedger>,
    ledger_dedup: bool,
    engine: NotificationEngine,
}

impl EmojiPipeline {
    pub fn new(filter: StalenessFilter, engine: NotificationEngine) -> Self {
        Self { filter, ledger: Arc::new(DeliveryLedger::new()), ledger_dedup: false, engine }
    }

    /// Suppress any event id the ledger has already accepted, even when the
    /// transport reports it as a first delivery.
    pub fn with_ledger_dedup(mut self, enabled: bool) -> Self {
        self.ledger_dedup = enabled;
        self
    }

    pub fn ledger(&self) -> Arc<DeliveryLedger> {
        self.ledger.clone()
    }

    pub fn engine(&self) -> &NotificationEngine {
        &self.engine
    }

    pub async fn process(
        &self,
        event: &EmojiLifecycleEvent,
    ) -> Result<PipelineOutcome, NotifyError> {
        self.process_at(event, Utc::now()).await
    }

    pub async fn process_at(
        &self,
        event: &EmojiLifecycleEvent,
        now: DateTime<Utc>,
    ) -> Result<PipelineOutcome, NotifyError> {
        let freshness = self.filter.check(event, now);
        match &freshness {
            Freshness::Fresh => {}
            Freshness::Stale { age } => {
                debug!(
                    event_name = "notifier.event.stale",
                    event_id = event.event_id(),
                    emoji = event.name(),
                    occurred_at = %event.occurred_at(),
                    age_secs = age.num_seconds(),
                    "ignoring old event"
                );
                return Ok(PipelineOutcome::Dropped(freshness));
            }
            Freshness::Retransmission { attempt } => {
                debug!(
                    event_name = "notifier.event.retry",
                    event_id = event.event_id(),
                    emoji = event.name(),
                    retry_attempt = attempt,
                    "ignoring retry event"
                );
                return Ok(PipelineOutcome::Dropped(freshness));
            }
        }

        let first_sighting = self.ledger.record(event.event_id(), now);
        if !first_sighting && self.ledger_dedup {
            debug!(
                event_name = "notifier.event.duplicate",
                event_id = event.event_id(),
                emoji = event.name(),
                "ignoring event id already accepted"
            );
            return Ok(PipelineOutcome::DuplicateDelivery);
        }

        match self.engine.handle(event).await {
            Ok(outcome) => Ok(PipelineOutcome::Handled(outcome)),
            Err(error) => {
                // Rolled-back deliveries stay replayable.
                if first_sighting {
                    self.ledger.forget(event.event_id());
                }
                Err(error)
            }
        }
    }
}

#[async_trait]
impl LifecycleSink for EmojiPipeline {
    async fn deliver(&self, event: EmojiLifecycleEvent) {
        if let Err(error) = self.process(&event).await {
            warn!(
                event_name = "notifier.event.failed",
                event_id = event.event_id(),
                emoji = error.emoji(),
                stage = error.stage(),
                error = %error,
                "emoji notification failed; ready for a later retry"
            );
        }
    }
}
