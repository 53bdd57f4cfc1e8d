//! Realtime transport
//!
//! ## 概要
//!
//! セッションはこのモジュールの `Connector` trait 越しにのみ接続を扱います。
//! 接続は送信用の `UnboundedSender<String>` と受信イベントの
//! `UnboundedReceiver<TransportEvent>` の組として表現されます。
//!
//! ## 実装
//!
//! - `websocket`: tokio-tungstenite を使った実装

pub mod websocket;

use async_trait::async_trait;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::error::TransportError;

pub use websocket::WebSocketConnector;

/// Event observed on an open connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One text frame
    Frame(String),
    /// The peer closed the connection, with its close reason if any
    Closed(Option<String>),
    /// The connection failed
    Error(String),
}

/// One open connection.
///
/// Dropping it aborts the tasks that pump the underlying socket.
pub struct Connection {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl Connection {
    pub fn new(
        outbound: mpsc::UnboundedSender<String>,
        inbound: mpsc::UnboundedReceiver<TransportEvent>,
        tasks: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            outbound,
            inbound,
            tasks,
        }
    }

    /// Queue one text frame; fire-and-forget.
    pub fn send(&self, text: String) -> Result<(), TransportError> {
        self.outbound
            .send(text)
            .map_err(|_| TransportError::Closed)
    }

    /// Next inbound event. `None` once the reader side has gone away.
    pub async fn recv(&mut self) -> Option<TransportEvent> {
        self.inbound.recv().await
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Opens room-scoped realtime connections
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<Connection, TransportError>;
}
