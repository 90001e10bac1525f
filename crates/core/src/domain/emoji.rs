use chrono::{DateTime, Utc};
use serde::Serialize;

/// Query parameter Slack's emoji CDN uses to serve the full-size rendition.
pub const FULL_SIZE_SELECTOR: &str = "size=512";

pub const ANNOUNCEMENT_BANNER: &str = "*NEW EMOJI ADDED!*\n*Example Usage:*\n";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmojiChange {
    Added { image_ref: String },
    Removed,
}

impl EmojiChange {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Added { .. } => "added",
            Self::Removed => "removed",
        }
    }
}

/// A custom emoji being added to or removed from the workspace, as delivered by
/// the transport. Built once by the classifier and consumed once by the notifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmojiLifecycleEvent {
    event_id: String,
    name: String,
    change: EmojiChange,
    occurred_at: DateTime<Utc>,
    delivery_attempt: u32,
}

impl EmojiLifecycleEvent {
    /// Returns `None` when the emoji name is blank.
    pub fn new(
        event_id: impl Into<String>,
        name: impl Into<String>,
        change: EmojiChange,
        occurred_at: DateTime<Utc>,
        delivery_attempt: u32,
    ) -> Option<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return None;
        }

        Some(Self { event_id: event_id.into(), name, change, occurred_at, delivery_attempt })
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn change(&self) -> &EmojiChange {
        &self.change
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn delivery_attempt(&self) -> u32 {
        self.delivery_attempt
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NotificationMessage {
    pub text: String,
    pub image_url: String,
    pub emoji_name: String,
}

impl NotificationMessage {
    pub fn announce(emoji_name: &str, image_ref: &str, generated_text: &str) -> Self {
        Self {
            text: format!("{ANNOUNCEMENT_BANNER}{generated_text}"),
            image_url: full_size_image_url(image_ref),
            emoji_name: emoji_name.to_owned(),
        }
    }
}

pub fn full_size_image_url(image_ref: &str) -> String {
    let separator = if image_ref.contains('?') { '&' } else { '?' };
    format!("{image_ref}{separator}{FULL_SIZE_SELECTOR}")
}
