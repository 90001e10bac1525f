use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmojiState {
    Unknown,
    Notifying,
    Notified,
}

/// Per-name notification state. Absent names are `Unknown`; only `Notifying`
/// and `Notified` are stored. The lock covers single transitions and is never
/// held while a caller awaits I/O.
#[derive(Debug, Default)]
pub struct KnownEmojiTable {
    states: Mutex<HashMap<String, EmojiState>>,
}

impl KnownEmojiTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, name: &str) -> EmojiState {
        self.lock().get(name).copied().unwrap_or(EmojiState::Unknown)
    }

    /// Moves `name` from `Unknown` to `Notifying`. When the name is already
    /// claimed or notified, returns its current state instead.
    pub fn try_claim(&self, name: &str) -> Result<Claim<'_>, EmojiState> {
        let mut states = self.lock();
        if let Some(current) = states.get(name) {
            return Err(*current);
        }

        states.insert(name.to_owned(), EmojiState::Notifying);
        Ok(Claim { table: self, name: name.to_owned(), settled: false })
    }

    /// Makes a `Notified` name eligible again. Any other state is left as is.
    /// Returns the state observed before the call.
    pub fn forget(&self, name: &str) -> EmojiState {
        let mut states = self.lock();
        match states.get(name).copied() {
            Some(EmojiState::Notified) => {
                states.remove(name);
                EmojiState::Notified
            }
            Some(other) => other,
            None => EmojiState::Unknown,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn set(&self, name: &str, state: EmojiState) {
        self.lock().insert(name.to_owned(), state);
    }

    fn release(&self, name: &str) {
        self.lock().remove(name);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, EmojiState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive right to notify for one emoji name. Must end in `commit` or
/// `rollback`; a claim dropped without either is rolled back.
#[derive(Debug)]
pub struct Claim<'a> {
    table: &'a KnownEmojiTable,
    name: String,
    settled: bool,
}

impl Claim<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commit(mut self) {
        self.table.set(&self.name, EmojiState::Notified);
        self.settled = true;
    }

    pub fn rollback(mut self) {
        self.table.release(&self.name);
        self.settled = true;
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!(
                event_name = "notifier.claim.abandoned",
                emoji = %self.name,
                "claim dropped before settling; releasing emoji"
            );
            self.table.release(&self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EmojiState, KnownEmojiTable};

    #[test]
    fn unknown_names_can_be_claimed_once() {
        let table = KnownEmojiTable::new();

        let claim = table.try_claim("tada").expect("first claim succeeds");
        assert_eq!(table.state("tada"), EmojiState::Notifying);
        assert_eq!(table.try_claim("tada").err(), Some(EmojiState::Notifying));

        claim.commit();
        assert_eq!(table.state("tada"), EmojiState::Notified);
        assert_eq!(table.try_claim("tada").err(), Some(EmojiState::Notified));
    }

    #[test]
    fn rollback_returns_name_to_unknown() {
        let table = KnownEmojiTable::new();

        table.try_claim("tada").expect("claim").rollback();

        assert_eq!(table.state("tada"), EmojiState::Unknown);
        assert!(table.is_empty());
        assert!(table.try_claim("tada").is_ok());
    }

    #[test]
    fn dropped_claim_releases_name() {
        let table = KnownEmojiTable::new();
        {
            let _claim = table.try_claim("orphan").expect("claim");
        }

        assert_eq!(table.state("orphan"), EmojiState::Unknown);
    }

    #[test]
    fn forget_only_resets_notified_names() {
        let table = KnownEmojiTable::new();
        table.try_claim("done").expect("claim").commit();
        let in_flight = table.try_claim("pending").expect("claim");

        assert_eq!(table.forget("done"), EmojiState::Notified);
        assert_eq!(table.state("done"), EmojiState::Unknown);

        assert_eq!(table.forget("pending"), EmojiState::Notifying);
        assert_eq!(table.state("pending"), EmojiState::Notifying);

        assert_eq!(table.forget("never-seen"), EmojiState::Unknown);
        in_flight.commit();
    }
}
