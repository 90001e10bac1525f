use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use slackmoji_core::config::LlmProvider;

use super::{drive_stream, parse_payload, ChatMessage, Delta, ErrorBody};
use crate::client::{ChunkSink, LlmClient, ProviderSettings};
use crate::decoder::Framing;
use crate::error::LlmError;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

const PROVIDER: &str = "openai";

/// Chat completions over server-sent events.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl OpenAiClient {
    pub fn new(settings: &ProviderSettings) -> Result<Self, LlmError> {
        Ok(Self {
            http: settings.http_client(LlmProvider::OpenAi)?,
            api_key: settings.require_api_key(LlmProvider::OpenAi)?,
            endpoint: format!("{}/v1/chat/completions", settings.base_url_or(OPENAI_BASE_URL)),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            system_prompt: settings.system_prompt.clone(),
        })
    }

    fn request_body<'a>(&'a self, message: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: &self.system_prompt },
                ChatMessage { role: "user", content: message },
            ],
            stream: true,
            max_completion_tokens: (self.max_tokens > 0).then_some(self.max_tokens),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn provider(&self) -> LlmProvider {
        LlmProvider::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn stream(&self, message: &str, sink: &mut ChunkSink<'_>) -> Result<String, LlmError> {
        let request = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.request_body(message));

        drive_stream(PROVIDER, request, Framing::ServerSentEvents, decode_chunk, sink).await
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: ChoiceDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChoiceDelta {
    content: Option<String>,
}

fn decode_chunk(payload: &str) -> Result<Delta, LlmError> {
    let chunk: StreamChunk = parse_payload(PROVIDER, payload)?;
    if let Some(error) = chunk.error {
        return Err(LlmError::Provider { provider: PROVIDER, message: error.message });
    }

    let text: String =
        chunk.choices.into_iter().filter_map(|choice| choice.delta.content).collect();
    Ok(Delta::Text(text))
}
