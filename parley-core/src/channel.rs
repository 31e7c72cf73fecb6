// ABOUTME: Resilient channel wrapping a byte-level transport with bounded reconnect-and-retry.
// ABOUTME: Exposes envelope-level read/write and turns exhausted retries into EndOfStream.

use crate::envelope::Envelope;
use crate::error::{EndCause, EndOfStream, TransportError};
use crate::retry::{RetryPolicy, RetryState};
use crate::validate::{decode, DecodeError, DecodePolicy, Inbound};
use async_trait::async_trait;

/// Byte-level port underneath a [`ResilientChannel`]
#[async_trait]
pub trait Transport: Send {
    /// Short label for logs, e.g. the URI or command
    fn describe(&self) -> String;

    /// How malformed payloads from this transport are treated
    fn decode_policy(&self) -> DecodePolicy {
        DecodePolicy::Lenient
    }

    /// Whether `recv` can ever produce frames
    fn can_read(&self) -> bool {
        true
    }

    /// Whether a lost connection can be reopened with `connect`.
    /// Accepted sockets and process stdio cannot; their first failure ends the stream.
    fn can_reconnect(&self) -> bool {
        true
    }

    /// Open (or reopen) the underlying connection
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Next text frame; `TransportError::Closed` when the peer went away
    async fn recv(&mut self) -> Result<String, TransportError>;

    async fn send(&mut self, frame: &str) -> Result<(), TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Destination for outbound envelopes: a channel or a registry broadcast
#[async_trait]
pub trait EnvelopeSink: Send {
    async fn write(&mut self, envelope: &Envelope) -> Result<(), EndOfStream>;
}

/// Envelope-level duplex channel
#[async_trait]
pub trait Channel: EnvelopeSink {
    async fn start(&mut self) -> Result<(), EndOfStream>;

    async fn read(&mut self) -> Result<Inbound, EndOfStream>;

    /// Send a pre-encoded frame (plain-text validation replies)
    async fn write_raw(&mut self, frame: &str) -> Result<(), EndOfStream>;

    /// Idempotent; never fails
    async fn stop(&mut self);

    fn can_read(&self) -> bool {
        true
    }

    fn state(&self) -> ChannelState;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    Stopped,
}

/// Channel that reconnects its transport on failure, within a retry budget
pub struct ResilientChannel<T: Transport> {
    transport: T,
    policy: RetryPolicy,
    state: ChannelState,
    /// Attempts already spent by reads that were cancelled mid-retry
    read_failures: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Connect,
    Read,
    Write,
}

impl Operation {
    fn as_str(self) -> &'static str {
        match self {
            Operation::Connect => "connect",
            Operation::Read => "read",
            Operation::Write => "write",
        }
    }
}

impl<T: Transport> ResilientChannel<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            state: ChannelState::Disconnected,
            read_failures: 0,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn ensure_open(&self) -> Result<(), EndOfStream> {
        if self.state == ChannelState::Stopped {
            return Err(EndOfStream::stopped());
        }
        Ok(())
    }

    /// One connect attempt, tracking state transitions
    async fn try_connect(&mut self) -> Result<(), TransportError> {
        self.state = ChannelState::Connecting;
        match self.transport.connect().await {
            Ok(()) => {
                self.state = ChannelState::Connected;
                Ok(())
            }
            Err(e) => {
                self.state = ChannelState::Disconnected;
                Err(e)
            }
        }
    }

    /// Drop a broken connection so the next attempt reconnects
    async fn mark_broken(&mut self) {
        self.state = ChannelState::Disconnected;
        if let Err(e) = self.transport.close().await {
            tracing::debug!(transport = %self.transport.describe(), error = %e, "Close after failure failed");
        }
    }

    /// Handle a failed recv/send: end at once when the transport cannot
    /// reconnect, otherwise spend one attempt from the budget
    async fn recover(
        &mut self,
        retry: &mut RetryState,
        error: TransportError,
        operation: Operation,
    ) -> Result<(), EndOfStream> {
        self.mark_broken().await;
        if !self.transport.can_reconnect() {
            tracing::debug!(
                transport = %self.transport.describe(),
                operation = operation.as_str(),
                error = %error,
                "Peer gone"
            );
            return Err(EndOfStream::closed());
        }
        self.back_off(retry, &error, operation).await
    }

    /// Spend one attempt from `retry`; sleeps before the next one or ends the stream
    async fn back_off(
        &mut self,
        retry: &mut RetryState,
        error: &TransportError,
        operation: Operation,
    ) -> Result<(), EndOfStream> {
        let next = retry.record_failure();
        if operation == Operation::Read {
            self.read_failures = retry.failures();
        }
        match next {
            Some(delay) => {
                tracing::warn!(
                    transport = %self.transport.describe(),
                    operation = operation.as_str(),
                    attempt = retry.failures(),
                    max_retries = self.policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Transport failed, retrying"
                );
                tokio::time::sleep(delay).await;
                Ok(())
            }
            None => {
                tracing::warn!(
                    transport = %self.transport.describe(),
                    operation = operation.as_str(),
                    attempts = retry.failures(),
                    error = %error,
                    "Retries exhausted"
                );
                Err(EndOfStream::new(EndCause::RetriesExhausted {
                    attempts: retry.failures(),
                    last_error: error.to_string(),
                }))
            }
        }
    }

    /// Reconnect if needed; a failed reconnect spends one attempt
    async fn reconnect_if_needed(
        &mut self,
        retry: &mut RetryState,
        operation: Operation,
    ) -> Result<bool, EndOfStream> {
        if self.state == ChannelState::Connected {
            return Ok(true);
        }
        match self.try_connect().await {
            Ok(()) => {
                if retry.failures() > 0 {
                    crate::metrics::record_reconnect();
                    tracing::info!(transport = %self.transport.describe(), "Reconnected");
                }
                Ok(true)
            }
            Err(e) => {
                self.back_off(retry, &e, operation).await?;
                Ok(false)
            }
        }
    }

    async fn send_frame(&mut self, frame: &str) -> Result<(), EndOfStream> {
        self.ensure_open()?;
        let mut retry = RetryState::new(self.policy.clone());

        loop {
            if !self.reconnect_if_needed(&mut retry, Operation::Write).await? {
                continue;
            }
            match self.transport.send(frame).await {
                Ok(()) => return Ok(()),
                Err(TransportError::Unsupported(op)) => {
                    return Err(EndOfStream::new(EndCause::Unsupported(op)))
                }
                Err(e) => self.recover(&mut retry, e, Operation::Write).await?,
            }
        }
    }

    /// Body of [`Channel::read`]; failures spent here survive a cancelled read
    async fn read_frame(&mut self, retry: &mut RetryState) -> Result<Inbound, EndOfStream> {
        loop {
            if !self.reconnect_if_needed(retry, Operation::Read).await? {
                continue;
            }
            match self.transport.recv().await {
                Ok(frame) => {
                    return match decode(&frame, self.transport.decode_policy()) {
                        Ok(inbound) => {
                            match &inbound {
                                Inbound::Message(envelope) => {
                                    crate::metrics::record_envelope_in(envelope.kind)
                                }
                                Inbound::Invalid(_) => crate::metrics::record_validation_error(),
                            }
                            Ok(inbound)
                        }
                        Err(DecodeError::Malformed(reason)) => {
                            tracing::warn!(
                                transport = %self.transport.describe(),
                                reason = %reason,
                                "Malformed payload ends the stream"
                            );
                            Err(EndOfStream::new(EndCause::Malformed(reason)))
                        }
                    };
                }
                Err(TransportError::Unsupported(op)) => {
                    return Err(EndOfStream::new(EndCause::Unsupported(op)))
                }
                Err(e) => self.recover(retry, e, Operation::Read).await?,
            }
        }
    }
}

#[async_trait]
impl<T: Transport> EnvelopeSink for ResilientChannel<T> {
    async fn write(&mut self, envelope: &Envelope) -> Result<(), EndOfStream> {
        self.ensure_open()?;
        let frame = envelope
            .to_json()
            .map_err(|e| EndOfStream::new(EndCause::Serialize(e.to_string())))?;
        self.send_frame(&frame).await?;
        crate::metrics::record_envelope_out(envelope.kind);
        Ok(())
    }
}

#[async_trait]
impl<T: Transport> Channel for ResilientChannel<T> {
    async fn start(&mut self) -> Result<(), EndOfStream> {
        self.ensure_open()?;
        let mut retry = RetryState::new(self.policy.clone());

        loop {
            match self.try_connect().await {
                Ok(()) => {
                    tracing::debug!(transport = %self.transport.describe(), "Channel connected");
                    return Ok(());
                }
                Err(e) => {
                    if !e.is_retryable() {
                        return Err(EndOfStream::new(EndCause::ConnectFailed {
                            attempts: retry.failures() + 1,
                            last_error: e.to_string(),
                        }));
                    }
                    if let Err(end) = self.back_off(&mut retry, &e, Operation::Connect).await {
                        let attempts = retry.failures();
                        let last_error = match end.cause {
                            EndCause::RetriesExhausted { last_error, .. } => last_error,
                            other => other.to_string(),
                        };
                        return Err(EndOfStream::new(EndCause::ConnectFailed {
                            attempts,
                            last_error,
                        }));
                    }
                }
            }
        }
    }

    async fn read(&mut self) -> Result<Inbound, EndOfStream> {
        self.ensure_open()?;
        if !self.transport.can_read() {
            return Err(EndOfStream::new(EndCause::Unsupported("read")));
        }
        let mut retry = RetryState::resume(self.policy.clone(), self.read_failures);
        let outcome = self.read_frame(&mut retry).await;
        self.read_failures = 0;
        outcome
    }

    async fn write_raw(&mut self, frame: &str) -> Result<(), EndOfStream> {
        self.send_frame(frame).await
    }

    async fn stop(&mut self) {
        if self.state == ChannelState::Stopped {
            return;
        }
        if matches!(
            self.state,
            ChannelState::Connected | ChannelState::Connecting
        ) {
            if let Err(e) = self.transport.close().await {
                tracing::debug!(transport = %self.transport.describe(), error = %e, "Close on stop failed");
            }
        }
        self.state = ChannelState::Stopped;
    }

    fn can_read(&self) -> bool {
        self.transport.can_read()
    }

    fn state(&self) -> ChannelState {
        self.state
    }
}

#[async_trait]
impl<C: Channel + ?Sized> EnvelopeSink for Box<C> {
    async fn write(&mut self, envelope: &Envelope) -> Result<(), EndOfStream> {
        (**self).write(envelope).await
    }
}

#[async_trait]
impl<C: Channel + ?Sized> Channel for Box<C> {
    async fn start(&mut self) -> Result<(), EndOfStream> {
        (**self).start().await
    }

    async fn read(&mut self) -> Result<Inbound, EndOfStream> {
        (**self).read().await
    }

    async fn write_raw(&mut self, frame: &str) -> Result<(), EndOfStream> {
        (**self).write_raw(frame).await
    }

    async fn stop(&mut self) {
        (**self).stop().await
    }

    fn can_read(&self) -> bool {
        (**self).can_read()
    }

    fn state(&self) -> ChannelState {
        (**self).state()
    }
}
