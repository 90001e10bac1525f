//! Streaming text generation against hosted and local LLM providers.

pub mod client;
pub mod decoder;
pub mod error;
pub mod factory;
pub mod generator;
pub mod providers;

pub use client::{LlmClient, ProviderSettings};
pub use error::LlmError;
pub use factory::build_client;
pub use generator::LlmGenerator;
