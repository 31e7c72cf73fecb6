// ABOUTME: Forwarder responder - answers every prompt with the prompt itself.
// ABOUTME: Lets a server relay input verbatim; streams the prompt as a single fragment.

use crate::conversation::Turn;
use crate::traits::{FragmentStream, Responder};
use anyhow::Result;
use async_trait::async_trait;
use futures::stream;
use std::sync::Arc;

/// Echoes the prompt back unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwarderResponder;

impl ForwarderResponder {
    pub fn new() -> Self {
        Self
    }

    /// Factory function for the registry
    pub fn factory() -> crate::registry::ResponderFactory {
        Box::new(|_config| Ok(Arc::new(ForwarderResponder::new()) as Arc<dyn Responder>))
    }
}

#[async_trait]
impl Responder for ForwarderResponder {
    fn name(&self) -> &'static str {
        "forwarder"
    }

    async fn get_response(&self, prompt: &str, _history: &[Turn]) -> Result<String> {
        Ok(prompt.to_string())
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn get_response_stream(&self, prompt: &str, _history: &[Turn]) -> Result<FragmentStream> {
        let prompt = prompt.to_string();
        Ok(Box::pin(stream::iter(vec![Ok::<String, anyhow::Error>(prompt)])))
    }
}
