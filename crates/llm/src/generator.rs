use std::sync::Arc;

use async_trait::async_trait;
use slackmoji_core::errors::GenerationError;
use slackmoji_core::notifier::Generator;

use crate::client::LlmClient;

/// Exposes an [`LlmClient`] to the notification engine as a buffered
/// [`Generator`].
#[derive(Clone)]
pub struct LlmGenerator {
    client: Arc<dyn LlmClient>,
}

impl LlmGenerator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.client.complete(prompt).await.map_err(|error| GenerationError(error.to_string()))
    }
}
