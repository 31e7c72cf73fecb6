// ABOUTME: Error types for channels and transports.
// ABOUTME: EndOfStream is the terminal signal that ends exactly one loop, never the process.

use thiserror::Error;

/// Failure reported by a byte-level transport.
///
/// The channel consumes these through its retry logic; callers above the
/// channel only ever see [`EndOfStream`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed: {0}")]
    Closed(String),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport does not support {0}")]
    Unsupported(&'static str),
}

impl TransportError {
    /// Whether a reconnect-and-retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::Unsupported(_))
    }
}

/// Why a channel stopped producing or accepting messages
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndCause {
    #[error("could not connect after {attempts} attempt(s): {last_error}")]
    ConnectFailed { attempts: u32, last_error: String },

    #[error("gave up after {attempts} attempt(s): {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("could not encode envelope: {0}")]
    Serialize(String),

    #[error("transport does not support {0}")]
    Unsupported(&'static str),

    #[error("channel stopped")]
    Stopped,

    #[error("peer closed the connection")]
    Closed,
}

/// Terminal signal: the channel can no longer produce or accept messages
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("end of stream: {cause}")]
pub struct EndOfStream {
    pub cause: EndCause,
}

impl EndOfStream {
    pub fn new(cause: EndCause) -> Self {
        Self { cause }
    }

    pub fn stopped() -> Self {
        Self::new(EndCause::Stopped)
    }

    pub fn closed() -> Self {
        Self::new(EndCause::Closed)
    }
}

impl From<EndCause> for EndOfStream {
    fn from(cause: EndCause) -> Self {
        Self::new(cause)
    }
}
