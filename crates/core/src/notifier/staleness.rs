//! Freshness heuristics for lifecycle events.
//!
//! Slack redelivers the same `emoji_changed` event minutes apart and also
//! retries deliveries it considers unacknowledged. Only the freshest first
//! delivery is actionable. Both checks are heuristics: an event redelivered
//! with `retry_attempt = 0` inside the window still passes, which is why the
//! notifier's table suppresses repeats on its own.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::EmojiLifecycleEvent;

pub const DEFAULT_FRESHNESS_THRESHOLD: Duration = Duration::from_secs(60);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale { age: TimeDelta },
    Retransmission { attempt: u32 },
}

impl Freshness {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StalenessFilter {
    threshold: Duration,
}

impl Default for StalenessFilter {
    fn default() -> Self {
        Self::new(DEFAULT_FRESHNESS_THRESHOLD)
    }
}

impl StalenessFilter {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn check(&self, event: &EmojiLifecycleEvent, now: DateTime<Utc>) -> Freshness {
        self.evaluate(event.occurred_at(), event.delivery_attempt(), now)
    }

    pub fn evaluate(
        &self,
        occurred_at: DateTime<Utc>,
        delivery_attempt: u32,
        now: DateTime<Utc>,
    ) -> Freshness {
        let age = now.signed_duration_since(occurred_at);
        let threshold = TimeDelta::from_std(self.threshold).unwrap_or(TimeDelta::MAX);
        if age > threshold {
            return Freshness::Stale { age };
        }

        if delivery_attempt > 0 {
            return Freshness::Retransmission { attempt: delivery_attempt };
        }

        Freshness::Fresh
    }
}
