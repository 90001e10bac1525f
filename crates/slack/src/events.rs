use chrono::{DateTime, Utc};
use serde::Deserialize;
use slackmoji_core::domain::{EmojiChange, EmojiLifecycleEvent};
use tracing::{debug, warn};

/// One Socket Mode frame, as Slack sends it over the websocket.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SocketEnvelope {
    Hello {
        #[serde(default)]
        num_connections: Option<u32>,
    },
    Disconnect {
        #[serde(default)]
        reason: Option<String>,
    },
    EventsApi {
        envelope_id: String,
        #[serde(default)]
        retry_attempt: u32,
        #[serde(default)]
        retry_reason: Option<String>,
        payload: serde_json::Value,
    },
    SlashCommands {
        envelope_id: String,
    },
    Interactive {
        envelope_id: String,
    },
    #[serde(other)]
    Unsupported,
}

impl SocketEnvelope {
    pub fn envelope_id(&self) -> Option<&str> {
        match self {
            Self::EventsApi { envelope_id, .. }
            | Self::SlashCommands { envelope_id }
            | Self::Interactive { envelope_id } => Some(envelope_id),
            Self::Hello { .. } | Self::Disconnect { .. } | Self::Unsupported => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::Disconnect { .. } => "disconnect",
            Self::EventsApi { .. } => "events_api",
            Self::SlashCommands { .. } => "slash_commands",
            Self::Interactive { .. } => "interactive",
            Self::Unsupported => "unsupported",
        }
    }
}

#[derive(Debug, Deserialize)]
struct EventCallback {
    event_id: String,
    event_time: i64,
    event: InnerEvent,
}

#[derive(Debug, Deserialize)]
struct InnerEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    value: Option<String>,
}

const ALIAS_PREFIX: &str = "alias:";

/// Maps a raw envelope to an emoji lifecycle event. Anything that is not an
/// `emoji_changed` add or remove yields `None`.
pub fn classify(envelope: &SocketEnvelope) -> Option<EmojiLifecycleEvent> {
    let SocketEnvelope::EventsApi { envelope_id, retry_attempt, payload, .. } = envelope else {
        return None;
    };

    let callback = match EventCallback::deserialize(payload) {
        Ok(callback) => callback,
        Err(error) => {
            warn!(
                event_name = "ingress.slack.payload_undecodable",
                envelope_id = %envelope_id,
                error = %error,
                "could not decode events api payload"
            );
            return None;
        }
    };

    let inner = callback.event;
    if inner.event_type != "emoji_changed" {
        return None;
    }

    let Some(occurred_at) = DateTime::<Utc>::from_timestamp(callback.event_time, 0) else {
        debug!(
            event_name = "ingress.slack.timestamp_out_of_range",
            envelope_id = %envelope_id,
            event_id = %callback.event_id,
            event_time = callback.event_time,
            "dropping emoji event with unrepresentable event_time"
        );
        return None;
    };

    let (name, change) = match inner.subtype.as_deref() {
        Some("add") => {
            let image_ref = inner.value.filter(|value| !value.starts_with(ALIAS_PREFIX))?;
            (inner.name?, EmojiChange::Added { image_ref })
        }
        Some("remove") => {
            let name = inner.name.or_else(|| inner.names.into_iter().next())?;
            (name, EmojiChange::Removed)
        }
        _ => return None,
    };

    EmojiLifecycleEvent::new(callback.event_id, name, change, occurred_at, *retry_attempt)
}
