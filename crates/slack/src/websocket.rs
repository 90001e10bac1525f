//! Socket Mode over a real websocket. Each `connect` asks the Web API for a
//! fresh URL, since Slack's URLs are single-use.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::events::SocketEnvelope;
use crate::socket::{SocketTransport, TransportError};
use crate::web::SlackWebClient;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WebSocketTransport {
    web: Arc<SlackWebClient>,
    writer: Mutex<Option<SplitSink<WsStream, Message>>>,
    reader: Mutex<Option<SplitStream<WsStream>>>,
}

impl WebSocketTransport {
    pub fn new(web: Arc<SlackWebClient>) -> Self {
        Self { web, writer: Mutex::new(None), reader: Mutex::new(None) }
    }
}

#[async_trait]
impl SocketTransport for WebSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let url = self
            .web
            .open_connection()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        let (writer, reader) = stream.split();

        *self.writer.lock().await = Some(writer);
        *self.reader.lock().await = Some(reader);
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SocketEnvelope>, TransportError> {
        let mut guard = self.reader.lock().await;
        let reader =
            guard.as_mut().ok_or_else(|| TransportError::Receive("not connected".to_owned()))?;

        loop {
            match reader.next().await {
                None => return Ok(None),
                Some(Err(error)) => return Err(TransportError::Receive(error.to_string())),
                Some(Ok(Message::Text(text))) => match serde_json::from_str(&text) {
                    Ok(envelope) => return Ok(Some(envelope)),
                    Err(error) => {
                        warn!(
                            event_name = "ingress.slack.frame_undecodable",
                            error = %error,
                            frame_len = text.len(),
                            "skipping undecodable socket mode frame"
                        );
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    debug!(frame = ?frame, "socket mode websocket closed by server");
                    return Ok(None);
                }
                Some(Ok(_)) => {}
            }
        }
    }

    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
        let ack = json!({ "envelope_id": envelope_id }).to_string();
        let mut guard = self.writer.lock().await;
        let writer =
            guard.as_mut().ok_or_else(|| TransportError::Acknowledge("not connected".to_owned()))?;

        writer
            .send(Message::Text(ack))
            .await
            .map_err(|error| TransportError::Acknowledge(error.to_string()))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let writer = self.writer.lock().await.take();
        self.reader.lock().await.take();

        if let Some(mut writer) = writer {
            writer.close().await.map_err(|error| TransportError::Disconnect(error.to_string()))?;
        }
        Ok(())
    }
}
