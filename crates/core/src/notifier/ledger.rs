use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// First-seen times of accepted event deliveries, keyed by event id. Bounded by
/// the janitor, which drops entries older than the freshness threshold.
#[derive(Debug, Default)]
pub struct DeliveryLedger {
    seen: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl DeliveryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `event_id` and reports whether this is its first sighting. Blank
    /// ids are never recorded and always count as first sightings.
    pub fn record(&self, event_id: &str, seen_at: DateTime<Utc>) -> bool {
        if event_id.trim().is_empty() {
            return true;
        }

        let mut seen = self.lock();
        if seen.contains_key(event_id) {
            return false;
        }
        seen.insert(event_id.to_owned(), seen_at);
        true
    }

    /// Drops `event_id` so a later delivery counts as a first sighting again.
    pub fn forget(&self, event_id: &str) -> bool {
        self.lock().remove(event_id).is_some()
    }

    pub fn contains(&self, event_id: &str) -> bool {
        self.lock().contains_key(event_id)
    }

    /// Removes entries whose age exceeds `max_age`; returns how many were removed.
    pub fn prune_older_than(&self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let max_age = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
        let mut seen = self.lock();
        let before = seen.len();
        seen.retain(|_, first_seen| now.signed_duration_since(*first_seen) <= max_age);
        before - seen.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
