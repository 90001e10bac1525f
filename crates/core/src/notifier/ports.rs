use async_trait::async_trait;

use crate::domain::{EmojiLifecycleEvent, NotificationMessage};
use crate::errors::{GenerationError, PublishError};

/// Produces the example sentence for a new emoji.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Delivers a finished announcement to the chat channel.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, message: &NotificationMessage) -> Result<(), PublishError>;
}

/// Receives classified lifecycle events from the transport loop.
#[async_trait]
pub trait LifecycleSink: Send + Sync {
    async fn deliver(&self, event: EmojiLifecycleEvent);
}
