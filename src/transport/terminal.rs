// ABOUTME: Terminal transport: questions typed on stdin, envelopes rendered to stdout.
// ABOUTME: Lines are decoded leniently, so plain typing becomes a questioner message.

use crate::ui::{Labels, TerminalRenderer};
use async_trait::async_trait;
use parley_core::validate::validate;
use parley_core::{Correlation, Correlator, Renderer, Transport, TransportError};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

pub struct TerminalTransport {
    lines: Option<Lines<BufReader<Stdin>>>,
    readable: bool,
    renderer: TerminalRenderer,
    correlator: Correlator,
}

impl TerminalTransport {
    /// Reads questions from stdin
    pub fn input(labels: Labels) -> Self {
        Self {
            lines: None,
            readable: true,
            renderer: TerminalRenderer::new(labels),
            correlator: Correlator::new(),
        }
    }

    /// Only renders; stdin is left to the input side
    pub fn output(labels: Labels) -> Self {
        Self {
            readable: false,
            ..Self::input(labels)
        }
    }
}

#[async_trait]
impl Transport for TerminalTransport {
    fn describe(&self) -> String {
        "terminal".to_string()
    }

    fn can_read(&self) -> bool {
        self.readable
    }

    fn can_reconnect(&self) -> bool {
        false
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.readable && self.lines.is_none() {
            self.lines = Some(BufReader::new(tokio::io::stdin()).lines());
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<String, TransportError> {
        if !self.readable {
            return Err(TransportError::Unsupported("read"));
        }
        let lines = self
            .lines
            .as_mut()
            .ok_or_else(|| TransportError::Closed("terminal not opened".to_string()))?;
        match lines.next_line().await? {
            Some(line) => Ok(line),
            None => Err(TransportError::Closed("stdin closed".to_string())),
        }
    }

    async fn send(&mut self, frame: &str) -> Result<(), TransportError> {
        let envelope = match validate(frame) {
            Ok(envelope) => envelope,
            Err(_) => {
                // Plain-text replies such as validation notices
                self.renderer.notice(frame);
                return Ok(());
            }
        };

        match self.correlator.ingest(&envelope) {
            Correlation::Continue {
                request_id,
                role,
                fragment,
                opened: true,
            } => self.renderer.stream_started(&request_id, role, &fragment),
            Correlation::Continue {
                request_id,
                fragment,
                ..
            } => self.renderer.stream_updated(&request_id, &fragment),
            Correlation::Complete {
                request_id,
                streamed: true,
                ..
            } => self.renderer.stream_finished(&request_id),
            Correlation::Complete { role, text, .. } => {
                if !text.is_empty() {
                    self.renderer.message(role, &text);
                }
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.correlator.clear();
        Ok(())
    }
}
