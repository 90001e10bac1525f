//! Slack integration over Socket Mode.
//!
//! - **Events** (`events`) - envelope decoding and emoji lifecycle classification
//! - **Socket Mode** (`socket`) - runner with reconnect policy over a pluggable transport
//! - **Websocket** (`websocket`) - the production transport
//! - **Web API** (`web`) - `apps.connections.open` and `chat.postMessage`
//! - **Messages** (`message`) - announcement payloads and the channel publisher
//!
//! The app needs Socket Mode enabled, an app-level token with
//! `connections:write`, a bot token with `chat:write`, and the `emoji_changed`
//! bot event subscription.

pub mod events;
pub mod message;
pub mod socket;
pub mod web;
pub mod websocket;

pub use events::{classify, SocketEnvelope};
pub use message::SlackPublisher;
pub use socket::{ReconnectPolicy, SocketError, SocketModeRunner, SocketTransport, TransportError};
pub use web::{SlackWebClient, WebApiError};
pub use websocket::WebSocketTransport;
