use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use slackmoji_core::domain::NotificationMessage;
use slackmoji_core::errors::PublishError;
use slackmoji_core::notifier::Publisher;
use tracing::info;

use crate::web::SlackWebClient;

/// `chat.postMessage` body: the announcement text plus one image attachment
/// captioned with the emoji name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PostMessage<'a> {
    pub channel: &'a str,
    pub text: &'a str,
    pub attachments: Vec<Attachment<'a>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Attachment<'a> {
    pub image_url: &'a str,
    pub text: &'a str,
}

impl<'a> PostMessage<'a> {
    pub fn announcement(channel: &'a str, message: &'a NotificationMessage) -> Self {
        Self {
            channel,
            text: &message.text,
            attachments: vec![Attachment { image_url: &message.image_url, text: &message.emoji_name }],
        }
    }
}

/// Posts notifications to one configured channel.
pub struct SlackPublisher {
    web: Arc<SlackWebClient>,
    channel: String,
}

impl SlackPublisher {
    pub fn new(web: Arc<SlackWebClient>, channel: impl Into<String>) -> Self {
        Self { web, channel: channel.into() }
    }
}

#[async_trait]
impl Publisher for SlackPublisher {
    async fn publish(&self, message: &NotificationMessage) -> Result<(), PublishError> {
        let payload = PostMessage::announcement(&self.channel, message);
        let ts = self.web.post_message(&payload).await.map_err(|error| PublishError(error.to_string()))?;

        info!(
            event_name = "egress.slack.message_posted",
            channel = %self.channel,
            emoji = %message.emoji_name,
            message_ts = %ts,
            "posted emoji announcement"
        );
        Ok(())
    }
}
