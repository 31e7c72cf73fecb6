// ABOUTME: Websocket client transport dialing a parley server; text frames carry JSON envelopes.
// ABOUTME: Decoding is strict: a frame that is not a JSON object ends the stream.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parley_core::validate::DecodePolicy;
use parley_core::{Transport, TransportError};
use tokio_tungstenite::{connect_async, tungstenite::Message};

type WebSocketStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

pub struct WebSocketTransport {
    uri: String,
    stream: Option<WebSocketStream>,
}

impl WebSocketTransport {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            stream: None,
        }
    }

    fn stream(&mut self) -> Result<&mut WebSocketStream, TransportError> {
        self.stream
            .as_mut()
            .ok_or_else(|| TransportError::Closed("not connected".to_string()))
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn describe(&self) -> String {
        self.uri.clone()
    }

    fn decode_policy(&self) -> DecodePolicy {
        DecodePolicy::Strict
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        let (stream, _) = connect_async(self.uri.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        self.stream = Some(stream);
        tracing::debug!(uri = %self.uri, "Websocket connected");
        Ok(())
    }

    async fn recv(&mut self) -> Result<String, TransportError> {
        let stream = self.stream()?;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
                // Left to strict decoding, which ends the stream without a reconnect
                Some(Ok(Message::Binary(bytes))) => {
                    return Ok(String::from_utf8_lossy(&bytes).into_owned())
                }
                Some(Ok(Message::Close(_))) | None => {
                    return Err(TransportError::Closed("server closed the connection".to_string()))
                }
                Some(Ok(_)) => continue, // Ignore pings, pongs, raw frames
                Some(Err(e)) => return Err(TransportError::Closed(e.to_string())),
            }
        }
    }

    async fn send(&mut self, frame: &str) -> Result<(), TransportError> {
        self.stream()?
            .send(Message::Text(frame.to_string().into()))
            .await
            .map_err(|e| TransportError::Closed(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            stream
                .close(None)
                .await
                .map_err(|e| TransportError::Closed(e.to_string()))?;
        }
        Ok(())
    }
}
