pub mod anthropic;
pub mod googleai;
pub mod ollama;
pub mod openai;

use std::time::Instant;

use tracing::debug;

pub use anthropic::AnthropicClient;
pub use googleai::GoogleAiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use crate::client::ChunkSink;
use crate::decoder::{Framing, LineBuffer, SSE_DONE};
use crate::error::LlmError;

/// What one decoded stream payload contributes.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Delta {
    Text(String),
    Skip,
    Done,
}

/// Sends `request`, then feeds every framed payload through `decode` until the
/// body ends or a payload reports completion.
pub(crate) async fn drive_stream<F>(
    provider: &'static str,
    request: reqwest::RequestBuilder,
    framing: Framing,
    mut decode: F,
    sink: &mut ChunkSink<'_>,
) -> Result<String, LlmError>
where
    F: FnMut(&str) -> Result<Delta, LlmError> + Send,
{
    let started = Instant::now();
    let mut response =
        request.send().await.map_err(|source| LlmError::Request { provider, source })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Status { provider, status: status.as_u16(), body });
    }

    let mut lines = LineBuffer::new();
    let mut completion = String::new();

    'body: loop {
        let chunk =
            response.chunk().await.map_err(|source| LlmError::Request { provider, source })?;
        let (batch, finished) = match chunk {
            Some(bytes) => (lines.push(&bytes), false),
            None => (lines.finish().into_iter().collect(), true),
        };

        for line in batch {
            let Some(payload) = framing.payload(&line) else {
                continue;
            };
            if payload == SSE_DONE {
                break 'body;
            }
            match decode(payload)? {
                Delta::Text(text) if !text.is_empty() => {
                    sink(&text);
                    completion.push_str(&text);
                }
                Delta::Text(_) | Delta::Skip => {}
                Delta::Done => break 'body,
            }
        }

        if finished {
            break;
        }
    }

    debug!(
        event_name = "llm.stream.completed",
        provider,
        elapsed_ms = started.elapsed().as_millis() as u64,
        chars = completion.chars().count(),
        "completion stream finished"
    );

    Ok(completion)
}

pub(crate) fn parse_payload<T: serde::de::DeserializeOwned>(
    provider: &'static str,
    payload: &str,
) -> Result<T, LlmError> {
    serde_json::from_str(payload).map_err(|source| LlmError::Decode { provider, source })
}

#[derive(Debug, serde::Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}
