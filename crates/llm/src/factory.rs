use std::sync::Arc;

use slackmoji_core::config::{LlmConfig, LlmProvider};
use tracing::debug;

use crate::client::{LlmClient, ProviderSettings};
use crate::error::LlmError;
use crate::providers::{AnthropicClient, GoogleAiClient, OllamaClient, OpenAiClient};

/// Builds the client for the configured provider. Nothing past this point looks
/// at provider identity.
pub fn build_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let settings = ProviderSettings::from_config(config);

    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::OpenAi => Arc::new(OpenAiClient::new(&settings)?),
        LlmProvider::Anthropic => Arc::new(AnthropicClient::new(&settings)?),
        LlmProvider::Ollama => Arc::new(OllamaClient::new(&settings)?),
        LlmProvider::GoogleAi => Arc::new(GoogleAiClient::new(&settings)?),
    };

    debug!(
        event_name = "llm.client.initialized",
        provider = client.provider().as_str(),
        model = client.model(),
        max_tokens = settings.max_tokens,
        "llm client initialized"
    );

    Ok(client)
}

#[cfg(test)]
mod tests {
    use slackmoji_core::config::{AppConfig, LlmProvider};

    use super::build_client;
    use crate::error::LlmError;

    #[test]
    fn each_provider_builds_its_own_client() {
        for provider in
            [LlmProvider::OpenAi, LlmProvider::Anthropic, LlmProvider::Ollama, LlmProvider::GoogleAi]
        {
            let mut config = AppConfig::default().llm;
            config.provider = provider;
            config.api_key = Some("key".to_owned().into());

            let client = build_client(&config).expect("client should build");

            assert_eq!(client.provider(), provider);
            assert_eq!(client.model(), provider.default_model());
        }
    }

    #[test]
    fn hosted_provider_without_key_is_rejected() {
        let config = AppConfig::default().llm;

        let error = build_client(&config).err().expect("missing key should fail");

        assert!(matches!(error, LlmError::MissingApiKey { provider: "openai" }));
    }

    #[test]
    fn ollama_needs_no_key() {
        let mut config = AppConfig::default().llm;
        config.provider = LlmProvider::Ollama;

        assert!(build_client(&config).is_ok());
    }
}
