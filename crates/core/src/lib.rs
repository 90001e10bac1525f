pub mod config;
pub mod domain;
pub mod errors;
pub mod notifier;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};
pub use domain::{EmojiChange, EmojiLifecycleEvent, NotificationMessage};
pub use errors::{GenerationError, NotifyError, PublishError};
pub use notifier::{
    EmojiPipeline, Generator, Janitor, LifecycleSink, NotificationEngine, NotifyMode,
    NotifyOutcome, PipelineOutcome, Publisher, StalenessFilter,
};
