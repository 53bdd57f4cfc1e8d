//! WebSocket を使った Connector 実装
//!
//! ## 責務
//!
//! - `connect_async` による接続確立
//! - ストリームを分割し、送信タスクと受信タスクを起動
//! - 受信したメッセージを `TransportEvent` に変換

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use super::{Connection, Connector, TransportEvent};
use crate::error::TransportError;

/// Connector backed by tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Connection, TransportError> {
        let (ws_stream, _response) =
            connect_async(url)
                .await
                .map_err(|e| TransportError::Connect {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
        tracing::debug!("WebSocket handshake with {} completed", url);

        let (mut write, mut read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<TransportEvent>();

        let write_task = tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    tracing::warn!("WebSocket write error: {}", e);
                    break;
                }
            }
            let _ = write.close().await;
        });

        let read_task = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let event = match message {
                    Ok(Message::Text(text)) => TransportEvent::Frame(text.to_string()),
                    Ok(Message::Binary(data)) => {
                        tracing::debug!("Ignoring binary frame ({} bytes)", data.len());
                        continue;
                    }
                    Ok(Message::Close(frame)) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .filter(|reason| !reason.is_empty());
                        let _ = inbound_tx.send(TransportEvent::Closed(reason));
                        return;
                    }
                    Err(e) => {
                        let _ = inbound_tx.send(TransportEvent::Error(e.to_string()));
                        return;
                    }
                    _ => continue,
                };
                if inbound_tx.send(event).is_err() {
                    return;
                }
            }
        });

        Ok(Connection::new(
            outbound_tx,
            inbound_rx,
            vec![write_task, read_task],
        ))
    }
}
