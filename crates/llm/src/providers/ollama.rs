use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slackmoji_core::config::{LlmProvider, DEFAULT_OLLAMA_BASE_URL};

use super::{drive_stream, parse_payload, ChatMessage, Delta};
use crate::client::{ChunkSink, LlmClient, ProviderSettings};
use crate::decoder::Framing;
use crate::error::LlmError;

const PROVIDER: &str = "ollama";

/// Local Ollama server, streamed as newline-delimited JSON. No credentials.
pub struct OllamaClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl OllamaClient {
    pub fn new(settings: &ProviderSettings) -> Result<Self, LlmError> {
        Ok(Self {
            http: settings.http_client(LlmProvider::Ollama)?,
            endpoint: format!("{}/api/chat", settings.base_url_or(DEFAULT_OLLAMA_BASE_URL)),
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
            options: (self.max_tokens > 0).then_some(ChatOptions { num_predict: self.max_tokens }),
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn provider(&self) -> LlmProvider {
        LlmProvider::Ollama
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn stream(&self, message: &str, sink: &mut ChunkSink<'_>) -> Result<String, LlmError> {
        let request = self.http.post(&self.endpoint).json(&self.request_body(message));
        drive_stream(PROVIDER, request, Framing::NdJson, decode_line, sink).await
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

fn decode_line(payload: &str) -> Result<Delta, LlmError> {
    let chunk: ChatChunk = parse_payload(PROVIDER, payload)?;
    if let Some(message) = chunk.error {
        return Err(LlmError::Provider { provider: PROVIDER, message });
    }
    if chunk.done {
        return Ok(match chunk.message {
            Some(message) if !message.content.is_empty() => Delta::Text(message.content),
            _ => Delta::Done,
        });
    }
    Ok(chunk.message.map(|message| Delta::Text(message.content)).unwrap_or(Delta::Skip))
}
