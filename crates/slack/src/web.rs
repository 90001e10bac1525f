use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::message::PostMessage;

pub const SLACK_API_BASE_URL: &str = "https://slack.com/api";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum WebApiError {
    #[error("could not build slack http client: {0}")]
    Build(reqwest::Error),
    #[error("slack `{method}` request failed: {source}")]
    Request { method: &'static str, source: reqwest::Error },
    #[error("slack `{method}` returned HTTP {status}")]
    Status { method: &'static str, status: u16 },
    #[error("slack `{method}` returned an unreadable body: {source}")]
    Decode { method: &'static str, source: serde_json::Error },
    #[error("slack `{method}` failed: {code}")]
    Api { method: &'static str, code: String },
}

impl WebApiError {
    /// Slack's machine-readable error code, e.g. `channel_not_found`.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Thin client over the two Web API methods the notifier needs.
pub struct SlackWebClient {
    http: reqwest::Client,
    base_url: String,
    app_token: SecretString,
    bot_token: SecretString,
}

impl SlackWebClient {
    pub fn new(app_token: SecretString, bot_token: SecretString) -> Result<Self, WebApiError> {
        let http =
            reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build().map_err(WebApiError::Build)?;
        Ok(Self { http, base_url: SLACK_API_BASE_URL.to_owned(), app_token, bot_token })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Asks Slack for a fresh Socket Mode websocket URL. Uses the app-level token.
    pub async fn open_connection(&self) -> Result<String, WebApiError> {
        let response: ConnectionsOpen =
            self.call("apps.connections.open", &self.app_token, None::<&()>).await?;
        Ok(response.url)
    }

    /// Posts a message as the bot and returns the message timestamp.
    pub async fn post_message(&self, message: &PostMessage<'_>) -> Result<String, WebApiError> {
        let response: PostMessageResponse =
            self.call("chat.postMessage", &self.bot_token, Some(message)).await?;
        Ok(response.ts)
    }

    async fn call<B, R>(
        &self,
        method: &'static str,
        token: &SecretString,
        body: Option<&B>,
    ) -> Result<R, WebApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .bearer_auth(token.expose_secret());
        request = match body {
            Some(body) => request.json(body),
            None => request.header("content-type", "application/x-www-form-urlencoded"),
        };

        let response =
            request.send().await.map_err(|source| WebApiError::Request { method, source })?;
        let status = response.status();
        if !status.is_success() {
            return Err(WebApiError::Status { method, status: status.as_u16() });
        }

        let bytes = response.bytes().await.map_err(|source| WebApiError::Request { method, source })?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|source| WebApiError::Decode { method, source })?;

        let ok = value.get("ok").and_then(serde_json::Value::as_bool).unwrap_or(false);
        if !ok {
            let code = value
                .get("error")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown_error")
                .to_owned();
            return Err(WebApiError::Api { method, code });
        }

        debug!(event_name = "egress.slack.web_api_ok", method, "slack web api call succeeded");
        serde_json::from_value(value).map_err(|source| WebApiError::Decode { method, source })
    }
}

#[derive(Debug, Deserialize)]
struct ConnectionsOpen {
    url: String,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    #[serde(default)]
    ts: String,
}
