use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use slackmoji_core::notifier::LifecycleSink;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::events::{classify, SocketEnvelope};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("socket mode gave up after {attempts} consecutive failed attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: TransportError },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    /// `Ok(None)` means the server closed the connection.
    async fn next_envelope(&self) -> Result<Option<SocketEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Debug, PartialEq, Eq)]
enum PumpExit {
    Cancelled,
    Closed,
}

/// Receives Socket Mode envelopes, acknowledges them and hands classified emoji
/// events to the sink one at a time.
pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    sink: Arc<dyn LifecycleSink>,
    reconnect_policy: ReconnectPolicy,
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        sink: Arc<dyn LifecycleSink>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, sink, reconnect_policy }
    }

    /// Runs until `cancel` fires (returns `Ok`) or the transport keeps failing
    /// past the retry budget. A server-initiated close is not a failure and
    /// resets the budget. The transport is left connected on cancellation.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), SocketError> {
        let mut failures: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }

            match self.connect_and_pump(failures, &cancel).await {
                Ok(PumpExit::Cancelled) => {
                    info!(event_name = "ingress.slack.stopped", "socket mode runner stopped");
                    return Ok(());
                }
                Ok(PumpExit::Closed) => {
                    failures = 0;
                    info!(event_name = "ingress.slack.reconnecting", "reconnecting socket mode");
                }
                Err(transport_error) => {
                    warn!(
                        event_name = "ingress.slack.transport_failed",
                        attempt = failures,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "socket mode transport failed"
                    );

                    if let Err(error) = self.transport.disconnect().await {
                        debug!(error = %error, "cleanup after transport failure also failed");
                    }

                    if failures >= self.reconnect_policy.max_retries {
                        error!(
                            event_name = "ingress.slack.retries_exhausted",
                            max_retries = self.reconnect_policy.max_retries,
                            "socket mode retries exhausted"
                        );
                        return Err(SocketError::RetriesExhausted {
                            attempts: failures + 1,
                            last_error: transport_error,
                        });
                    }

                    let delay = self.reconnect_policy.backoff(failures);
                    failures += 1;
                    if !delay.is_zero() {
                        tokio::select! {
                            _ = cancel.cancelled() => return Ok(()),
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            }
        }
    }

    async fn connect_and_pump(
        &self,
        attempt: u32,
        cancel: &CancellationToken,
    ) -> Result<PumpExit, TransportError> {
        info!(attempt, "opening socket mode transport connection");
        tokio::select! {
            _ = cancel.cancelled() => return Ok(PumpExit::Cancelled),
            connected = self.transport.connect() => connected?,
        }
        info!(attempt, "socket mode transport connected");

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Ok(PumpExit::Cancelled),
                next = self.transport.next_envelope() => next?,
            };

            let Some(envelope) = next else {
                info!(attempt, "socket mode transport stream closed");
                self.transport.disconnect().await?;
                return Ok(PumpExit::Closed);
            };

            match &envelope {
                SocketEnvelope::Hello { num_connections } => {
                    debug!(
                        event_name = "ingress.slack.hello",
                        num_connections = num_connections.unwrap_or_default(),
                        "socket mode handshake complete"
                    );
                    continue;
                }
                SocketEnvelope::Disconnect { reason } => {
                    info!(
                        event_name = "ingress.slack.disconnect_requested",
                        reason = reason.as_deref().unwrap_or("unknown"),
                        "slack asked for a reconnect"
                    );
                    self.transport.disconnect().await?;
                    return Ok(PumpExit::Closed);
                }
                _ => {}
            }

            let envelope_id = envelope.envelope_id().unwrap_or("none");
            info!(
                event_name = "ingress.slack.envelope_received",
                envelope_id = %envelope_id,
                envelope_type = envelope.kind(),
                correlation_id = %envelope_id,
                "received slack envelope"
            );

            if let Some(id) = envelope.envelope_id() {
                if let Err(error) = self.transport.acknowledge(id).await {
                    warn!(
                        event_name = "ingress.slack.ack_failed",
                        envelope_id = %id,
                        correlation_id = %id,
                        error = %error,
                        "failed to acknowledge slack envelope"
                    );
                } else {
                    debug!(
                        event_name = "ingress.slack.ack_sent",
                        envelope_id = %id,
                        correlation_id = %id,
                        "acknowledged slack envelope"
                    );
                }
            }

            let Some(event) = classify(&envelope) else {
                debug!(
                    envelope_id = %envelope_id,
                    envelope_type = envelope.kind(),
                    "envelope carries no emoji lifecycle event"
                );
                continue;
            };

            debug!(
                event_name = "ingress.slack.emoji_event",
                envelope_id = %envelope_id,
                event_id = event.event_id(),
                emoji = event.name(),
                change = event.change().label(),
                retry_attempt = event.delivery_attempt(),
                "classified emoji lifecycle event"
            );
            self.sink.deliver(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;
    use slackmoji_core::domain::EmojiLifecycleEvent;
    use slackmoji_core::notifier::LifecycleSink;
    use tokio::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    use super::{ReconnectPolicy, SocketError, SocketModeRunner, SocketTransport, TransportError};
    use crate::events::SocketEnvelope;

    #[derive(Default)]
    struct ScriptedTransport {
        state: Mutex<ScriptedState>,
        cancel_when_drained: Option<CancellationToken>,
    }

    #[derive(Default)]
    struct ScriptedState {
        connect_results: VecDeque<Result<(), TransportError>>,
        envelopes: VecDeque<Result<Option<SocketEnvelope>, TransportError>>,
        connect_attempts: usize,
        acknowledgements: Vec<String>,
        failing_acks: usize,
        disconnect_calls: usize,
    }

    impl ScriptedTransport {
        fn with_script(
            connect_results: Vec<Result<(), TransportError>>,
            envelopes: Vec<Result<Option<SocketEnvelope>, TransportError>>,
            cancel_when_drained: Option<CancellationToken>,
        ) -> Self {
            Self {
                state: Mutex::new(ScriptedState {
                    connect_results: connect_results.into(),
                    envelopes: envelopes.into(),
                    ..ScriptedState::default()
                }),
                cancel_when_drained,
            }
        }

        async fn connect_attempts(&self) -> usize {
            self.state.lock().await.connect_attempts
        }

        async fn acknowledgements(&self) -> Vec<String> {
            self.state.lock().await.acknowledgements.clone()
        }

        async fn disconnect_calls(&self) -> usize {
            self.state.lock().await.disconnect_calls
        }
    }

    #[async_trait]
    impl SocketTransport for ScriptedTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.connect_attempts += 1;
            state.connect_results.pop_front().unwrap_or(Ok(()))
        }

        async fn next_envelope(&self) -> Result<Option<SocketEnvelope>, TransportError> {
            let next = self.state.lock().await.envelopes.pop_front();
            match next {
                Some(scripted) => scripted,
                None => {
                    if let Some(cancel) = &self.cancel_when_drained {
                        cancel.cancel();
                    }
                    std::future::pending().await
                }
            }
        }

        async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            if state.failing_acks > 0 {
                state.failing_acks -= 1;
                return Err(TransportError::Acknowledge("socket write closed".to_owned()));
            }
            state.acknowledgements.push(envelope_id.to_owned());
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.disconnect_calls += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<EmojiLifecycleEvent>>,
    }

    #[async_trait]
    impl LifecycleSink for RecordingSink {
        async fn deliver(&self, event: EmojiLifecycleEvent) {
            self.delivered.lock().await.push(event);
        }
    }

    fn emoji_added(envelope_id: &str, name: &str) -> SocketEnvelope {
        SocketEnvelope::EventsApi {
            envelope_id: envelope_id.to_owned(),
            retry_attempt: 0,
            retry_reason: None,
            payload: json!({
                "event_id": format!("Ev-{envelope_id}"),
                "event_time": 1_730_000_000,
                "event": {"type": "emoji_changed", "subtype": "add", "name": name, "value": "https://x/e.png"}
            }),
        }
    }

    fn instant_policy(max_retries: u32) -> ReconnectPolicy {
        ReconnectPolicy { max_retries, base_delay_ms: 0, max_delay_ms: 0 }
    }

    #[tokio::test]
    async fn reconnects_after_initial_connect_failure() {
        let cancel = CancellationToken::new();
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Err(TransportError::Connect("network down".to_owned())), Ok(())],
            vec![Ok(Some(SocketEnvelope::Hello { num_connections: Some(1) })), Ok(Some(emoji_added("env-1", "tada")))],
            Some(cancel.clone()),
        ));
        let sink = Arc::new(RecordingSink::default());

        let runner = SocketModeRunner::new(transport.clone(), sink.clone(), instant_policy(2));
        runner.run(cancel).await.expect("runner should stop cleanly on cancellation");

        assert_eq!(transport.connect_attempts().await, 2);
        assert_eq!(transport.acknowledgements().await, vec!["env-1"]);
        let delivered = sink.delivered.lock().await;
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].name(), "tada");
    }

    #[tokio::test]
    async fn exhausted_retries_are_fatal() {
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![
                Err(TransportError::Connect("fail-1".to_owned())),
                Err(TransportError::Connect("fail-2".to_owned())),
                Err(TransportError::Connect("fail-3".to_owned())),
            ],
            vec![],
            None,
        ));

        let runner = SocketModeRunner::new(
            transport.clone(),
            Arc::new(RecordingSink::default()),
            instant_policy(2),
        );

        let error = runner.run(CancellationToken::new()).await.expect_err("retries exhausted");
        assert!(matches!(
            error,
            SocketError::RetriesExhausted { attempts: 3, last_error: TransportError::Connect(ref message) }
                if message == "fail-3"
        ));
        assert_eq!(transport.connect_attempts().await, 3);
    }

    #[tokio::test]
    async fn disconnect_frame_triggers_reconnect_without_spending_retries() {
        let cancel = CancellationToken::new();
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(()), Ok(()), Ok(())],
            vec![
                Ok(Some(SocketEnvelope::Disconnect { reason: Some("warning".to_owned()) })),
                Ok(None),
                Ok(Some(emoji_added("env-9", "blob"))),
            ],
            Some(cancel.clone()),
        ));
        let sink = Arc::new(RecordingSink::default());

        let runner = SocketModeRunner::new(transport.clone(), sink.clone(), instant_policy(0));
        runner.run(cancel).await.expect("server-initiated closes are not failures");

        assert_eq!(transport.connect_attempts().await, 3);
        assert_eq!(transport.disconnect_calls().await, 2);
        assert_eq!(sink.delivered.lock().await.len(), 1);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("log buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().expect("log buffer")).into_owned()
        }
    }

    #[tokio::test]
    async fn failed_ack_is_reported_and_event_still_delivered() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let cancel = CancellationToken::new();
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![],
            vec![Ok(Some(emoji_added("env-5", "tada")))],
            Some(cancel.clone()),
        ));
        transport.state.lock().await.failing_acks = 1;
        let sink = Arc::new(RecordingSink::default());

        let runner = SocketModeRunner::new(transport.clone(), sink.clone(), instant_policy(0));
        runner.run(cancel).await.expect("ack failures are not fatal");

        assert!(transport.acknowledgements().await.is_empty());
        assert_eq!(sink.delivered.lock().await.len(), 1);

        let output = logs.contents();
        assert!(output.contains("ingress.slack.ack_failed"), "logs were: {output}");
        assert!(!output.contains("ingress.slack.ack_sent"), "logs were: {output}");
    }

    #[tokio::test]
    async fn non_emoji_envelopes_are_acked_but_not_delivered() {
        let cancel = CancellationToken::new();
        let message_event = SocketEnvelope::EventsApi {
            envelope_id: "env-2".to_owned(),
            retry_attempt: 0,
            retry_reason: None,
            payload: json!({"event_id": "Ev2", "event_time": 1, "event": {"type": "message"}}),
        };
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![],
            vec![
                Ok(Some(message_event)),
                Ok(Some(SocketEnvelope::SlashCommands { envelope_id: "env-3".to_owned() })),
            ],
            Some(cancel.clone()),
        ));
        let sink = Arc::new(RecordingSink::default());

        let runner = SocketModeRunner::new(transport.clone(), sink.clone(), instant_policy(0));
        runner.run(cancel).await.expect("clean stop");

        assert_eq!(transport.acknowledgements().await, vec!["env-2", "env-3"]);
        assert!(sink.delivered.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let cancel = CancellationToken::new();
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Err(TransportError::Connect("down".to_owned()))],
            vec![],
            None,
        ));
        let runner = SocketModeRunner::new(
            transport.clone(),
            Arc::new(RecordingSink::default()),
            ReconnectPolicy { max_retries: 5, base_delay_ms: 60_000, max_delay_ms: 60_000 },
        );

        let task = {
            let cancel = cancel.clone();
            tokio::spawn(async move { runner.run(cancel).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();

        let outcome = task.await.expect("runner task joins");
        assert!(outcome.is_ok());
        assert_eq!(transport.connect_attempts().await, 1);
    }

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        let policy = ReconnectPolicy::default();

        assert_eq!(policy.backoff(0), Duration::from_millis(250));
        assert_eq!(policy.backoff(2), Duration::from_millis(1_000));
        assert_eq!(policy.backoff(10), Duration::from_millis(5_000));
    }
}
