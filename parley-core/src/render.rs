// ABOUTME: Display seam for incoming and outgoing messages.
// ABOUTME: Every hook defaults to a no-op so headless loops need no renderer logic.

use crate::envelope::{RequestId, Role};

/// Receives display events from the orchestrator and client relay
pub trait Renderer: Send + Sync {
    /// First fragment of a streamed message
    fn stream_started(&self, _request_id: &RequestId, _role: Role, _fragment: &str) {}

    fn stream_updated(&self, _request_id: &RequestId, _fragment: &str) {}

    fn stream_finished(&self, _request_id: &RequestId) {}

    /// A complete message that was not streamed
    fn message(&self, _role: Role, _text: &str) {}

    /// Status line for the local operator
    fn notice(&self, _text: &str) {}
}

/// Renderer that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {}
