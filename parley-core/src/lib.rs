// ABOUTME: Resilient streaming transport and request correlation for turn-based chat.
// ABOUTME: Envelope validation, retrying channels, fan-out registry, correlator, and orchestrator.

pub mod channel;
pub mod config;
pub mod correlator;
pub mod envelope;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod paths;
pub mod registry;
pub mod render;
pub mod retry;
pub mod validate;

pub use channel::{Channel, ChannelState, EnvelopeSink, ResilientChannel, Transport};
pub use correlator::{Correlation, Correlator};
pub use envelope::{Envelope, FieldError, MessageType, RequestId, Role};
pub use error::{EndCause, EndOfStream, TransportError};
pub use orchestrator::{Orchestrator, OrchestratorConfig, SessionEnd};
pub use registry::{BroadcastPolicy, BroadcastReport, Connection, ConnectionId, ConnectionRegistry, RegistrySink};
pub use render::{NullRenderer, Renderer};
pub use retry::{RetryPolicy, RetryState};
pub use validate::{decode, validate, DecodeError, DecodePolicy, Inbound, ValidationError, ValidationReply};

// Re-export parley-agent types
pub use parley_agent::{Conversation, Responder, SharedConversation, Turn};
