use std::sync::Arc;

use slackmoji_core::config::{AppConfig, ConfigError, LoadOptions};
use slackmoji_core::notifier::{EmojiPipeline, NotificationEngine, NotifyMode, StalenessFilter};
use slackmoji_llm::{build_client, LlmError, LlmGenerator};
use slackmoji_slack::{
    ReconnectPolicy, SlackPublisher, SlackWebClient, SocketModeRunner, SocketTransport,
    WebApiError, WebSocketTransport,
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub pipeline: Arc<EmojiPipeline>,
    pub transport: Arc<dyn SocketTransport>,
    pub runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("llm client setup failed: {0}")]
    Llm(#[from] LlmError),
    #[error("slack client setup failed: {0}")]
    Slack(#[from] WebApiError),
}

impl BootstrapError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_validation",
            Self::Llm(_) => "llm_setup",
            Self::Slack(_) => "slack_setup",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Llm(_) | Self::Slack(_) => 1,
        }
    }
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

/// Wires the generator, publisher, pipeline and Socket Mode runner. Opens no
/// network connections; the runner connects when started.
pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        provider = config.llm.provider.as_str(),
        "starting application bootstrap"
    );

    let llm = build_client(&config.llm)?;
    let web = Arc::new(SlackWebClient::new(
        config.slack.app_token.clone(),
        config.slack.bot_token.clone(),
    )?);

    let mode = if config.slack.log_only { NotifyMode::ObserveOnly } else { NotifyMode::Live };
    let engine = NotificationEngine::new(
        Arc::new(LlmGenerator::new(llm)),
        Arc::new(SlackPublisher::new(web.clone(), config.slack.channel.clone())),
        mode,
    );
    let pipeline = Arc::new(
        EmojiPipeline::new(StalenessFilter::new(config.notifier.freshness_threshold()), engine)
            .with_ledger_dedup(config.notifier.ledger_dedup),
    );

    let transport: Arc<dyn SocketTransport> = Arc::new(WebSocketTransport::new(web));
    let runner =
        SocketModeRunner::new(transport.clone(), pipeline.clone(), ReconnectPolicy::default());

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        channel = %config.slack.channel,
        mode = ?mode,
        freshness_secs = config.notifier.freshness_secs,
        "notifier wired"
    );

    Ok(Application { config, pipeline, transport, runner })
}
