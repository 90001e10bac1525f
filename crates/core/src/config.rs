use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_SYSTEM_PROMPT: &str = "Generate an edgy, short sentence in modern Gen-Z tone \
about the given emoji name, and attempt to use a modern and humorous pop culture reference. Do \
not use proper punctuation, especially periods. Make sure to wrap the exact emoji name \
as-provided in colons so it can be properly formatted into a Slack emoji. For example, if the \
emoji name is \"smile\", the included string should be \":smile:\". Don't use other emojis.";

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub llm: LlmConfig,
    pub notifier: NotifierConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub app_token: SecretString,
    pub bot_token: SecretString,
    pub channel: String,
    pub log_only: bool,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub system_prompt: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct NotifierConfig {
    pub freshness_secs: u64,
    pub shutdown_grace_secs: u64,
    pub ledger_dedup: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "googleai")]
    GoogleAi,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub slack_app_token: Option<String>,
    pub slack_bot_token: Option<String>,
    pub slack_channel: Option<String>,
    pub log_only: Option<bool>,
    pub freshness_secs: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            slack: SlackConfig {
                app_token: String::new().into(),
                bot_token: String::new().into(),
                channel: String::new(),
                log_only: false,
            },
            llm: LlmConfig {
                provider: LlmProvider::OpenAi,
                api_key: None,
                base_url: None,
                model: None,
                max_tokens: None,
                system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
                timeout_secs: 60,
            },
            notifier: NotifierConfig {
                freshness_secs: 60,
                shutdown_grace_secs: 5,
                ledger_dedup: false,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            "googleai" => Ok(Self::GoogleAi),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama|googleai)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
            Self::GoogleAi => "googleai",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-5-nano",
            Self::Anthropic => "claude-3-5-haiku-latest",
            Self::Ollama => "llama3.2:1b",
            Self::GoogleAi => "gemini-2.5-flash-lite",
        }
    }

    /// Ollama runs without a completion budget unless one is configured.
    pub fn default_max_tokens(&self) -> u32 {
        match self {
            Self::Ollama => 0,
            Self::OpenAi | Self::Anthropic | Self::GoogleAi => 1024,
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }

    /// Provider-native environment prefix, e.g. `OPENAI` for `OPENAI_API_KEY`.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI",
            Self::Anthropic => "ANTHROPIC",
            Self::Ollama => "OLLAMA",
            Self::GoogleAi => "GOOGLEAI",
        }
    }
}

impl LlmConfig {
    /// Switches provider. Key, model, base URL and token limit chosen for a
    /// different provider are dropped with it.
    fn select_provider(&mut self, provider: LlmProvider) {
        if self.provider == provider {
            return;
        }
        self.provider = provider;
        self.api_key = None;
        self.base_url = None;
        self.model = None;
        self.max_tokens = None;
    }

    pub fn effective_model(&self) -> &str {
        self.model
            .as_deref()
            .filter(|model| !model.trim().is_empty())
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn effective_max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or_else(|| self.provider.default_max_tokens())
    }

    pub fn effective_base_url(&self) -> Option<&str> {
        match (&self.base_url, self.provider) {
            (Some(base_url), _) => Some(base_url.as_str()),
            (None, LlmProvider::Ollama) => Some(DEFAULT_OLLAMA_BASE_URL),
            (None, _) => None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl NotifierConfig {
    pub fn freshness_threshold(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let config = Self::assemble(options)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates only the `[llm]` and `[logging]` sections, for
    /// commands that never talk to Slack.
    pub fn load_for_generation(options: LoadOptions) -> Result<Self, ConfigError> {
        let config = Self::assemble(options)?;
        validate_llm(&config.llm)?;
        validate_logging(&config.logging)?;
        Ok(config)
    }

    fn assemble(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("slackmoji.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        // Provider-native env names depend on the final provider, so settle it
        // across every layer before reading them.
        let env_provider = read_env_any(&["SLACKMOJI_LLM_PROVIDER", "LLM_PROVIDER"])
            .map(|value| value.parse::<LlmProvider>())
            .transpose()?;
        if let Some(provider) = options.overrides.llm_provider.or(env_provider) {
            config.llm.select_provider(provider);
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(slack) = patch.slack {
            if let Some(slack_app_token_value) = slack.app_token {
                self.slack.app_token = secret_value(slack_app_token_value);
            }
            if let Some(slack_bot_token_value) = slack.bot_token {
                self.slack.bot_token = secret_value(slack_bot_token_value);
            }
            if let Some(channel) = slack.channel {
                self.slack.channel = channel;
            }
            if let Some(log_only) = slack.log_only {
                self.slack.log_only = log_only;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = Some(model);
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = Some(max_tokens);
            }
            if let Some(system_prompt) = llm.system_prompt {
                self.llm.system_prompt = system_prompt;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(notifier) = patch.notifier {
            if let Some(freshness_secs) = notifier.freshness_secs {
                self.notifier.freshness_secs = freshness_secs;
            }
            if let Some(shutdown_grace_secs) = notifier.shutdown_grace_secs {
                self.notifier.shutdown_grace_secs = shutdown_grace_secs;
            }
            if let Some(ledger_dedup) = notifier.ledger_dedup {
                self.notifier.ledger_dedup = ledger_dedup;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env_any(&["SLACKMOJI_SLACK_APP_TOKEN", "SLACK_APP_TOKEN"]) {
            self.slack.app_token = secret_value(value);
        }
        if let Some(value) = read_env_any(&["SLACKMOJI_SLACK_BOT_TOKEN", "SLACK_BOT_TOKEN"]) {
            self.slack.bot_token = secret_value(value);
        }
        if let Some(value) = read_env_any(&["SLACKMOJI_SLACK_CHANNEL", "SLACK_CHANNEL"]) {
            self.slack.channel = value;
        }
        if let Some(value) = read_env_any(&["SLACKMOJI_SLACK_LOG_ONLY", "SLACK_LOG_ONLY"]) {
            self.slack.log_only = parse_bool("SLACKMOJI_SLACK_LOG_ONLY", &value)?;
        }

        if let Some(value) = read_env_any(&["SLACKMOJI_LLM_SYSTEM_PROMPT", "LLM_SYSTEM_PROMPT"]) {
            self.llm.system_prompt = value;
        }

        let prefix = self.llm.provider.env_prefix();
        let api_key_var = format!("{prefix}_API_KEY");
        let model_var = format!("{prefix}_MODEL");
        let max_tokens_var = format!("{prefix}_MAX_TOKENS");
        let base_url_var = format!("{prefix}_BASE_URL");

        if let Some(value) = read_env_any(&["SLACKMOJI_LLM_API_KEY", &api_key_var]) {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env_any(&["SLACKMOJI_LLM_BASE_URL", &base_url_var]) {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env_any(&["SLACKMOJI_LLM_MODEL", &model_var]) {
            self.llm.model = Some(value);
        }
        if let Some(value) = read_env_any(&["SLACKMOJI_LLM_MAX_TOKENS", &max_tokens_var]) {
            self.llm.max_tokens = Some(parse_u32(&max_tokens_var, &value)?);
        }
        if let Some(value) = read_env("SLACKMOJI_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("SLACKMOJI_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SLACKMOJI_NOTIFIER_FRESHNESS_SECS") {
            self.notifier.freshness_secs =
                parse_u64("SLACKMOJI_NOTIFIER_FRESHNESS_SECS", &value)?;
        }
        if let Some(value) = read_env("SLACKMOJI_NOTIFIER_SHUTDOWN_GRACE_SECS") {
            self.notifier.shutdown_grace_secs =
                parse_u64("SLACKMOJI_NOTIFIER_SHUTDOWN_GRACE_SECS", &value)?;
        }
        if let Some(value) = read_env("SLACKMOJI_NOTIFIER_LEDGER_DEDUP") {
            self.notifier.ledger_dedup = parse_bool("SLACKMOJI_NOTIFIER_LEDGER_DEDUP", &value)?;
        }

        let log_level =
            read_env("SLACKMOJI_LOGGING_LEVEL").or_else(|| read_env("SLACKMOJI_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SLACKMOJI_LOGGING_FORMAT").or_else(|| read_env("SLACKMOJI_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = Some(llm_model);
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(slack_app_token) = overrides.slack_app_token {
            self.slack.app_token = secret_value(slack_app_token);
        }
        if let Some(slack_bot_token) = overrides.slack_bot_token {
            self.slack.bot_token = secret_value(slack_bot_token);
        }
        if let Some(slack_channel) = overrides.slack_channel {
            self.slack.channel = slack_channel;
        }
        if let Some(log_only) = overrides.log_only {
            self.slack.log_only = log_only;
        }
        if let Some(freshness_secs) = overrides.freshness_secs {
            self.notifier.freshness_secs = freshness_secs;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_slack(&self.slack)?;
        validate_llm(&self.llm)?;
        validate_notifier(&self.notifier)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("slackmoji.toml"), PathBuf::from("config/slackmoji.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_slack(slack: &SlackConfig) -> Result<(), ConfigError> {
    let app_token = slack.app_token.expose_secret();
    if app_token.is_empty() {
        return Err(ConfigError::Validation(
            "slack.app_token is required (SLACK_APP_TOKEN). Get it from https://api.slack.com/apps > Your App > Basic Information > App-Level Tokens".to_string()
        ));
    }
    if !app_token.starts_with("xapp-") {
        let hint = if app_token.starts_with("xoxb-") {
            " (hint: you may have used the bot token instead of the app token)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "slack.app_token must start with `xapp-`{hint}. Get it from https://api.slack.com/apps"
        )));
    }

    let bot_token = slack.bot_token.expose_secret();
    if bot_token.is_empty() {
        return Err(ConfigError::Validation(
            "slack.bot_token is required (SLACK_BOT_TOKEN). Get it from https://api.slack.com/apps > Your App > OAuth & Permissions > Bot User OAuth Token".to_string()
        ));
    }
    if !bot_token.starts_with("xoxb-") {
        let hint = if bot_token.starts_with("xapp-") {
            " (hint: you may have used the app token instead of the bot token)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "slack.bot_token must start with `xoxb-`{hint}. Get it from https://api.slack.com/apps"
        )));
    }

    if slack.channel.trim().is_empty() {
        return Err(ConfigError::Validation(
            "slack.channel is required (SLACK_CHANNEL): the channel name or id announcements are posted to"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.system_prompt.trim().is_empty() {
        return Err(ConfigError::Validation("llm.system_prompt must not be empty".to_string()));
    }

    if llm.provider.requires_api_key() {
        let missing = llm
            .api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(format!(
                "llm.api_key is required for the {provider} provider (set {prefix}_API_KEY or SLACKMOJI_LLM_API_KEY)",
                provider = llm.provider.as_str(),
                prefix = llm.provider.env_prefix(),
            )));
        }
    }

    if let Some(base_url) = llm.effective_base_url() {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_notifier(notifier: &NotifierConfig) -> Result<(), ConfigError> {
    if notifier.freshness_secs == 0 {
        return Err(ConfigError::Validation(
            "notifier.freshness_secs must be greater than zero".to_string(),
        ));
    }

    if notifier.shutdown_grace_secs == 0 {
        return Err(ConfigError::Validation(
            "notifier.shutdown_grace_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn read_env_any(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| read_env(key))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    slack: Option<SlackPatch>,
    llm: Option<LlmPatch>,
    notifier: Option<NotifierPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    app_token: Option<String>,
    bot_token: Option<String>,
    channel: Option<String>,
    log_only: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    system_prompt: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct NotifierPatch {
    freshness_secs: Option<u64>,
    shutdown_grace_secs: Option<u64>,
    ledger_dedup: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
