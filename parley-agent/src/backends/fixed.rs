// ABOUTME: Fixed-reply responder - a canned persona that always says the same thing.
// ABOUTME: Streams its reply word by word so the streaming path can be exercised without an LLM.

use crate::conversation::Turn;
use crate::traits::{FragmentStream, Responder};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration for the fixed responder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedConfig {
    /// Text returned for every prompt
    pub reply: String,
}

pub struct FixedResponder {
    reply: String,
}

impl FixedResponder {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }

    /// Factory function for the registry
    pub fn factory() -> crate::registry::ResponderFactory {
        Box::new(|config| {
            let cfg: FixedConfig = serde_json::from_value(config.clone())
                .context("fixed responder requires a `reply` string")?;
            Ok(Arc::new(FixedResponder::new(cfg.reply)) as Arc<dyn Responder>)
        })
    }
}

/// Split text into fragments that keep their trailing whitespace, so that
/// concatenating them reproduces the input exactly.
pub fn split_fragments(text: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut current = String::new();
    let mut in_space = false;

    for ch in text.chars() {
        if !ch.is_whitespace() && in_space {
            fragments.push(std::mem::take(&mut current));
            in_space = false;
        }
        if ch.is_whitespace() {
            in_space = true;
        }
        current.push(ch);
    }
    if !current.is_empty() {
        fragments.push(current);
    }
    fragments
}

#[async_trait]
impl Responder for FixedResponder {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn get_response(&self, _prompt: &str, _history: &[Turn]) -> Result<String> {
        Ok(self.reply.clone())
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn get_response_stream(&self, _prompt: &str, _history: &[Turn]) -> Result<FragmentStream> {
        let fragments: Vec<Result<String>> =
            split_fragments(&self.reply).into_iter().map(Ok).collect();
        Ok(Box::pin(stream::iter(fragments)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_fragments_round_trips_text() {
        let text = "Woof woof,\n good  boy ";
        let fragments = split_fragments(text);
        assert_eq!(fragments, vec!["Woof ", "woof,\n ", "good  ", "boy "]);
        assert_eq!(fragments.concat(), text);
    }

    #[test]
    fn test_split_fragments_empty() {
        assert!(split_fragments("").is_empty());
    }

    #[test]
    fn test_factory_requires_reply() {
        let factory = FixedResponder::factory();
        assert!(factory(&serde_json::json!({})).is_err());
        let responder = factory(&serde_json::json!({"reply": "woof"})).unwrap();
        assert_eq!(responder.name(), "fixed");
    }
}
