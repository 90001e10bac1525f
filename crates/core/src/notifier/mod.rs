//! Emoji lifecycle intake: freshness filtering, at-most-once notification and
//! ledger upkeep.

pub mod engine;
pub mod janitor;
pub mod ledger;
pub mod pipeline;
pub mod ports;
pub mod staleness;
pub mod table;

pub use engine::{prompt_for, NotificationEngine, NotifyMode, NotifyOutcome};
pub use janitor::Janitor;
pub use ledger::DeliveryLedger;
pub use pipeline::{EmojiPipeline, PipelineOutcome};
pub use ports::{Generator, LifecycleSink, Publisher};
pub use staleness::{Freshness, StalenessFilter, DEFAULT_FRESHNESS_THRESHOLD};
pub use table::{Claim, EmojiState, KnownEmojiTable};
