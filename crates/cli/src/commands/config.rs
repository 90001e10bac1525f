use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use slackmoji_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Sources {
    doc: Option<Value>,
    path: Option<PathBuf>,
}

impl Sources {
    fn detect() -> Self {
        let path = detect_config_path();
        let doc = load_config_file_doc(path.as_deref());
        Self { doc, path }
    }

    fn of(&self, key_path: &str, env_keys: &[&str]) -> String {
        field_source(key_path, env_keys, self.doc.as_ref(), self.path.as_deref())
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };
    render(&config, &Sources::detect())
}

fn render(config: &AppConfig, sources: &Sources) -> String {
    let prefix = config.llm.provider.env_prefix();
    let api_key_var = format!("{prefix}_API_KEY");
    let model_var = format!("{prefix}_MODEL");
    let base_url_var = format!("{prefix}_BASE_URL");
    let max_tokens_var = format!("{prefix}_MAX_TOKENS");

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "slack.app_token",
        &redact_token(&config.slack.app_token),
        sources.of("slack.app_token", &["SLACKMOJI_SLACK_APP_TOKEN", "SLACK_APP_TOKEN"]),
    ));
    lines.push(render_line(
        "slack.bot_token",
        &redact_token(&config.slack.bot_token),
        sources.of("slack.bot_token", &["SLACKMOJI_SLACK_BOT_TOKEN", "SLACK_BOT_TOKEN"]),
    ));
    lines.push(render_line(
        "slack.channel",
        &config.slack.channel,
        sources.of("slack.channel", &["SLACKMOJI_SLACK_CHANNEL", "SLACK_CHANNEL"]),
    ));
    lines.push(render_line(
        "slack.log_only",
        &config.slack.log_only.to_string(),
        sources.of("slack.log_only", &["SLACKMOJI_SLACK_LOG_ONLY", "SLACK_LOG_ONLY"]),
    ));

    lines.push(render_line(
        "llm.provider",
        config.llm.provider.as_str(),
        sources.of("llm.provider", &["SLACKMOJI_LLM_PROVIDER", "LLM_PROVIDER"]),
    ));
    lines.push(render_line(
        "llm.model",
        config.llm.effective_model(),
        sources.of("llm.model", &["SLACKMOJI_LLM_MODEL", &model_var]),
    ));
    lines.push(render_line(
        "llm.base_url",
        config.llm.effective_base_url().unwrap_or("<provider default>"),
        sources.of("llm.base_url", &["SLACKMOJI_LLM_BASE_URL", &base_url_var]),
    ));
    let max_tokens = match config.llm.effective_max_tokens() {
        0 => "<unlimited>".to_string(),
        limit => limit.to_string(),
    };
    lines.push(render_line(
        "llm.max_tokens",
        &max_tokens,
        sources.of("llm.max_tokens", &["SLACKMOJI_LLM_MAX_TOKENS", &max_tokens_var]),
    ));

    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "llm.api_key",
        llm_api_key,
        sources.of("llm.api_key", &["SLACKMOJI_LLM_API_KEY", &api_key_var]),
    ));
    lines.push(render_line(
        "llm.timeout_secs",
        &config.llm.timeout_secs.to_string(),
        sources.of("llm.timeout_secs", &["SLACKMOJI_LLM_TIMEOUT_SECS"]),
    ));

    lines.push(render_line(
        "notifier.freshness_secs",
        &config.notifier.freshness_secs.to_string(),
        sources.of("notifier.freshness_secs", &["SLACKMOJI_NOTIFIER_FRESHNESS_SECS"]),
    ));
    lines.push(render_line(
        "notifier.shutdown_grace_secs",
        &config.notifier.shutdown_grace_secs.to_string(),
        sources.of("notifier.shutdown_grace_secs", &["SLACKMOJI_NOTIFIER_SHUTDOWN_GRACE_SECS"]),
    ));
    lines.push(render_line(
        "notifier.ledger_dedup",
        &config.notifier.ledger_dedup.to_string(),
        sources.of("notifier.ledger_dedup", &["SLACKMOJI_NOTIFIER_LEDGER_DEDUP"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        sources.of("logging.level", &["SLACKMOJI_LOGGING_LEVEL", "SLACKMOJI_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        sources.of("logging.format", &["SLACKMOJI_LOGGING_FORMAT", "SLACKMOJI_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("slackmoji.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/slackmoji.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &SecretString) -> String {
    let trimmed = token.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
