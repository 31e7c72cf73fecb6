// ABOUTME: Write-only transport emitting one JSON envelope per stdout line.
// ABOUTME: Lets another process consume the conversation as newline-delimited JSON.

use async_trait::async_trait;
use parley_core::{Transport, TransportError};
use tokio::io::{AsyncWriteExt, Stdout};

#[derive(Default)]
pub struct StdoutTransport {
    out: Option<Stdout>,
}

impl StdoutTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for StdoutTransport {
    fn describe(&self) -> String {
        "stdout".to_string()
    }

    fn can_read(&self) -> bool {
        false
    }

    fn can_reconnect(&self) -> bool {
        false
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.out.is_none() {
            self.out = Some(tokio::io::stdout());
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<String, TransportError> {
        Err(TransportError::Unsupported("read"))
    }

    async fn send(&mut self, frame: &str) -> Result<(), TransportError> {
        let out = self
            .out
            .as_mut()
            .ok_or_else(|| TransportError::Closed("stdout not opened".to_string()))?;
        out.write_all(frame.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut out) = self.out.take() {
            out.flush().await?;
        }
        Ok(())
    }
}
