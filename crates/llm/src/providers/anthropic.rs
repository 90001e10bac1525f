use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use slackmoji_core::config::LlmProvider;

use super::{drive_stream, parse_payload, ChatMessage, Delta, ErrorBody};
use crate::client::{ChunkSink, LlmClient, ProviderSettings};
use crate::decoder::Framing;
use crate::error::LlmError;

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

const PROVIDER: &str = "anthropic";

/// The messages API requires a budget, so a zero setting falls back to this.
const FALLBACK_MAX_TOKENS: u32 = 1024;

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl AnthropicClient {
    pub fn new(settings: &ProviderSettings) -> Result<Self, LlmError> {
        Ok(Self {
            http: settings.http_client(LlmProvider::Anthropic)?,
            api_key: settings.require_api_key(LlmProvider::Anthropic)?,
            endpoint: format!("{}/v1/messages", settings.base_url_or(ANTHROPIC_BASE_URL)),
            model: settings.model.clone(),
            max_tokens: if settings.max_tokens > 0 {
                settings.max_tokens
            } else {
                FALLBACK_MAX_TOKENS
            },
            system_prompt: settings.system_prompt.clone(),
        })
    }

    fn request_body<'a>(&'a self, message: &'a str) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: &self.system_prompt,
            messages: vec![ChatMessage { role: "user", content: message }],
            stream: true,
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> LlmProvider {
        LlmProvider::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn stream(&self, message: &str, sink: &mut ChunkSink<'_>) -> Result<String, LlmError> {
        let request = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(message));

        drive_stream(PROVIDER, request, Framing::ServerSentEvents, decode_event, sink).await
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: BlockDelta },
    MessageStop,
    Error { error: ErrorBody },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

fn decode_event(payload: &str) -> Result<Delta, LlmError> {
    match parse_payload::<StreamEvent>(PROVIDER, payload)? {
        StreamEvent::ContentBlockDelta { delta: BlockDelta::TextDelta { text } } => {
            Ok(Delta::Text(text))
        }
        StreamEvent::ContentBlockDelta { delta: BlockDelta::Other } | StreamEvent::Other => {
            Ok(Delta::Skip)
        }
        StreamEvent::MessageStop => Ok(Delta::Done),
        StreamEvent::Error { error } => {
            Err(LlmError::Provider { provider: PROVIDER, message: error.message })
        }
    }
}
