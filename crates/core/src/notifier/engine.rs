use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::domain::{EmojiChange, EmojiLifecycleEvent, NotificationMessage};
use crate::errors::{GenerationError, NotifyError};
use crate::notifier::ports::{Generator, Publisher};
use crate::notifier::table::{EmojiState, KnownEmojiTable};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyMode {
    #[default]
    Live,
    /// Claims and commits names without generating or posting.
    ObserveOnly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifyOutcome {
    Notified,
    Observed,
    Suppressed(EmojiState),
    Reset,
    Unchanged(EmojiState),
}

pub fn prompt_for(emoji_name: &str) -> String {
    format!("emoji name: {emoji_name}")
}

/// Decides, at most once per emoji name, whether an addition gets announced.
///
/// State per name moves `Unknown -> Notifying -> Notified`. A failed generation
/// or post returns the name to `Unknown` so a later delivery can retry, and a
/// removal of a `Notified` emoji makes it eligible again.
pub struct NotificationEngine {
    table: KnownEmojiTable,
    generator: Arc<dyn Generator>,
    publisher: Arc<dyn Publisher>,
    mode: NotifyMode,
}

impl NotificationEngine {
    pub fn new(
        generator: Arc<dyn Generator>,
        publisher: Arc<dyn Publisher>,
        mode: NotifyMode,
    ) -> Self {
        Self { table: KnownEmojiTable::new(), generator, publisher, mode }
    }

    pub fn mode(&self) -> NotifyMode {
        self.mode
    }

    pub fn state_of(&self, emoji_name: &str) -> EmojiState {
        self.table.state(emoji_name)
    }

    pub fn table(&self) -> &KnownEmojiTable {
        &self.table
    }

    pub async fn handle(&self, event: &EmojiLifecycleEvent) -> Result<NotifyOutcome, NotifyError> {
        match event.change() {
            EmojiChange::Added { image_ref } => self.announce(event.name(), image_ref).await,
            EmojiChange::Removed => Ok(self.retire(event.name())),
        }
    }

    async fn announce(&self, name: &str, image_ref: &str) -> Result<NotifyOutcome, NotifyError> {
        let claim = match self.table.try_claim(name) {
            Ok(claim) => claim,
            Err(state) => {
                debug!(
                    event_name = "notifier.emoji.suppressed",
                    emoji = name,
                    state = ?state,
                    "ignoring known emoji"
                );
                return Ok(NotifyOutcome::Suppressed(state));
            }
        };

        info!(event_name = "notifier.emoji.claimed", emoji = name, "handling new emoji");

        if self.mode == NotifyMode::ObserveOnly {
            info!(
                event_name = "notifier.emoji.observed",
                emoji = name,
                "observe-only mode: would have generated sentence and posted announcement"
            );
            claim.commit();
            return Ok(NotifyOutcome::Observed);
        }

        let generated = match self.generator.generate(&prompt_for(name)).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                claim.rollback();
                let source = GenerationError("backend returned an empty completion".to_owned());
                error!(
                    event_name = "notifier.emoji.generation_failed",
                    emoji = name,
                    error = %source,
                    "failed to generate sentence"
                );
                return Err(NotifyError::Generation { emoji: name.to_owned(), source });
            }
            Err(source) => {
                claim.rollback();
                error!(
                    event_name = "notifier.emoji.generation_failed",
                    emoji = name,
                    error = %source,
                    "failed to generate sentence"
                );
                return Err(NotifyError::Generation { emoji: name.to_owned(), source });
            }
        };
        debug!(emoji = name, sentence = %generated.trim(), "generated sentence for new emoji");

        let message = NotificationMessage::announce(name, image_ref, generated.trim());
        if let Err(source) = self.publisher.publish(&message).await {
            claim.rollback();
            error!(
                event_name = "notifier.emoji.publish_failed",
                emoji = name,
                error = %source,
                "failed to post announcement"
            );
            return Err(NotifyError::Publish { emoji: name.to_owned(), source });
        }

        claim.commit();
        info!(
            event_name = "notifier.emoji.notified",
            emoji = name,
            image_url = %message.image_url,
            "announcement posted"
        );
        Ok(NotifyOutcome::Notified)
    }

    fn retire(&self, name: &str) -> NotifyOutcome {
        match self.table.forget(name) {
            EmojiState::Notified => {
                info!(
                    event_name = "notifier.emoji.reset",
                    emoji = name,
                    "removing emoji from known emojis"
                );
                NotifyOutcome::Reset
            }
            state => {
                debug!(
                    event_name = "notifier.emoji.remove_ignored",
                    emoji = name,
                    state = ?state,
                    "ignoring removal of emoji that is not notified"
                );
                NotifyOutcome::Unchanged(state)
            }
        }
    }
}
