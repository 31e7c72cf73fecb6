// ABOUTME: Server side of an accepted websocket: a registry Connection plus a read-only Transport.
// ABOUTME: The socket cannot be redialled, so losing it ends that connection's loop.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parley_core::{Connection, ConnectionId, Transport, TransportError};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Outbound half, shared between the registry and the connection's own loop
pub struct AcceptedConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

impl AcceptedConnection {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            id: ConnectionId::new(),
            sink: Mutex::new(sink),
        }
    }

    pub async fn close(&self) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::Closed(e.to_string()))
    }
}

#[async_trait]
impl Connection for AcceptedConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn send(&self, frame: &str) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .send(Message::Text(frame.to_string().into()))
            .await
            .map_err(|e| TransportError::Closed(e.to_string()))
    }
}

/// Inbound half; replies written through it go to this client only
pub struct AcceptedTransport {
    stream: SplitStream<WebSocket>,
    connection: Arc<AcceptedConnection>,
    opened: bool,
}

impl AcceptedTransport {
    pub fn new(stream: SplitStream<WebSocket>, connection: Arc<AcceptedConnection>) -> Self {
        Self {
            stream,
            connection,
            opened: false,
        }
    }
}

#[async_trait]
impl Transport for AcceptedTransport {
    fn describe(&self) -> String {
        format!("client {}", self.connection.id())
    }

    fn can_reconnect(&self) -> bool {
        false
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.opened {
            return Err(TransportError::Unsupported("reconnecting an accepted socket"));
        }
        self.opened = true;
        Ok(())
    }

    async fn recv(&mut self) -> Result<String, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
                Some(Ok(Message::Binary(bytes))) => {
                    return Ok(String::from_utf8_lossy(&bytes).into_owned())
                }
                Some(Ok(Message::Close(_))) | None => {
                    return Err(TransportError::Closed("client disconnected".to_string()))
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(TransportError::Closed(e.to_string())),
            }
        }
    }

    async fn send(&mut self, frame: &str) -> Result<(), TransportError> {
        self.connection.send(frame).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.connection.close().await
    }
}
