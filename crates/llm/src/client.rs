use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use slackmoji_core::config::{LlmConfig, LlmProvider};

use crate::error::LlmError;

/// Receives completion text as the provider streams it.
pub type ChunkSink<'a> = dyn FnMut(&str) + Send + 'a;

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> LlmProvider;

    fn model(&self) -> &str;

    /// Sends the system prompt and `message`, forwarding each streamed chunk to
    /// `sink`. Returns the full completion once the stream ends.
    async fn stream(&self, message: &str, sink: &mut ChunkSink<'_>) -> Result<String, LlmError>;

    async fn complete(&self, message: &str) -> Result<String, LlmError> {
        self.stream(message, &mut |_chunk: &str| {}).await
    }
}

/// Resolved per-provider settings, with defaults already applied.
#[derive(Clone, Debug)]
pub struct ProviderSettings {
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub system_prompt: String,
    pub timeout: Duration,
}

impl ProviderSettings {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.effective_base_url().map(str::to_owned),
            model: config.effective_model().to_owned(),
            max_tokens: config.effective_max_tokens(),
            system_prompt: config.system_prompt.clone(),
            timeout: config.timeout(),
        }
    }

    pub(crate) fn base_url_or(&self, default: &str) -> String {
        self.base_url.as_deref().unwrap_or(default).trim_end_matches('/').to_owned()
    }

    pub(crate) fn http_client(&self, provider: LlmProvider) -> Result<reqwest::Client, LlmError> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|source| LlmError::Build { provider: provider.as_str(), source })
    }

    pub(crate) fn require_api_key(&self, provider: LlmProvider) -> Result<SecretString, LlmError> {
        self.api_key.clone().ok_or(LlmError::MissingApiKey { provider: provider.as_str() })
    }
}
