use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("could not build {provider} http client: {source}")]
    Build { provider: &'static str, source: reqwest::Error },
    #[error("{provider} requires an api key")]
    MissingApiKey { provider: &'static str },
    #[error("{provider} request failed: {source}")]
    Request { provider: &'static str, source: reqwest::Error },
    #[error("{provider} returned HTTP {status}: {body}")]
    Status { provider: &'static str, status: u16, body: String },
    #[error("{provider} sent an undecodable stream payload: {source}")]
    Decode { provider: &'static str, source: serde_json::Error },
    #[error("{provider} reported an error: {message}")]
    Provider { provider: &'static str, message: String },
}

impl LlmError {
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Build { provider, .. }
            | Self::MissingApiKey { provider }
            | Self::Request { provider, .. }
            | Self::Status { provider, .. }
            | Self::Decode { provider, .. }
            | Self::Provider { provider, .. } => provider,
        }
    }
}
