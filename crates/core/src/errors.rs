use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("text generation failed: {0}")]
pub struct GenerationError(pub String);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("message post failed: {0}")]
pub struct PublishError(pub String);

/// Failures surfaced by the notifier. Every variant is recoverable: the emoji's
/// claim has already been released when the caller sees it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification for `{emoji}` rolled back: {source}")]
    Generation { emoji: String, source: GenerationError },
    #[error("notification for `{emoji}` rolled back: {source}")]
    Publish { emoji: String, source: PublishError },
}

impl NotifyError {
    pub fn emoji(&self) -> &str {
        match self {
            Self::Generation { emoji, .. } | Self::Publish { emoji, .. } => emoji,
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            Self::Generation { .. } => "generate",
            Self::Publish { .. } => "publish",
        }
    }
}
