use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use slackmoji_core::config::LlmProvider;

use super::{drive_stream, parse_payload, Delta, ErrorBody};
use crate::client::{ChunkSink, LlmClient, ProviderSettings};
use crate::decoder::Framing;
use crate::error::LlmError;

pub const GOOGLEAI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const PROVIDER: &str = "googleai";

pub struct GoogleAiClient {
    http: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl GoogleAiClient {
    pub fn new(settings: &ProviderSettings) -> Result<Self, LlmError> {
        Ok(Self {
            http: settings.http_client(LlmProvider::GoogleAi)?,
            api_key: settings.require_api_key(LlmProvider::GoogleAi)?,
            endpoint: format!(
                "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
                settings.base_url_or(GOOGLEAI_BASE_URL),
                settings.model
            ),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            system_prompt: settings.system_prompt.clone(),
        })
    }

    fn request_body<'a>(&'a self, message: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            system_instruction: Content { role: None, parts: vec![Part { text: &self.system_prompt }] },
            contents: vec![Content { role: Some("user"), parts: vec![Part { text: message }] }],
            generation_config: (self.max_tokens > 0)
                .then_some(GenerationConfig { max_output_tokens: self.max_tokens }),
        }
    }
}

#[async_trait]
impl LlmClient for GoogleAiClient {
    fn provider(&self) -> LlmProvider {
        LlmProvider::GoogleAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn stream(&self, message: &str, sink: &mut ChunkSink<'_>) -> Result<String, LlmError> {
        let request = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&self.request_body(message));

        drive_stream(PROVIDER, request, Framing::ServerSentEvents, decode_chunk, sink).await
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

fn decode_chunk(payload: &str) -> Result<Delta, LlmError> {
    let chunk: GenerateChunk = parse_payload(PROVIDER, payload)?;
    if let Some(error) = chunk.error {
        return Err(LlmError::Provider { provider: PROVIDER, message: error.message });
    }

    let text: String = chunk
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .filter_map(|part| part.text)
        .collect();
    Ok(Delta::Text(text))
}
