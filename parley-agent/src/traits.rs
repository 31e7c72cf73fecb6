// ABOUTME: Core Responder trait that every answer strategy implements.
// ABOUTME: Blocking answers are mandatory; streaming is an opt-in capability with a default.

use crate::conversation::Turn;
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, BoxStream};

/// Lazy, finite, non-restartable sequence of answer fragments.
///
/// Concatenating every `Ok` item yields the full answer. An `Err` item ends the
/// answer early; whatever arrived before it is still usable.
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// Answer strategy consumed by the orchestrator.
///
/// Implementations decide once, through [`Responder::supports_streaming`],
/// whether they can stream. Callers never probe for methods at runtime.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Responder name for logging and metrics
    fn name(&self) -> &'static str;

    /// Produce the whole answer for `prompt` in one call
    async fn get_response(&self, prompt: &str, history: &[Turn]) -> Result<String>;

    /// Whether [`Responder::get_response_stream`] yields real incremental output
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Produce the answer as a fragment stream.
    ///
    /// The default wraps [`Responder::get_response`] in a single-item stream.
    async fn get_response_stream(&self, prompt: &str, history: &[Turn]) -> Result<FragmentStream> {
        let text = self.get_response(prompt, history).await?;
        Ok(Box::pin(stream::once(async move { Ok::<String, anyhow::Error>(text) })))
    }
}

/// How an answer is delivered for one request
pub enum Reply {
    /// The complete answer
    Blocking(String),
    /// Incremental fragments
    Streaming(FragmentStream),
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::Blocking(text) => f.debug_tuple("Blocking").field(text).finish(),
            Reply::Streaming(_) => f.write_str("Streaming(..)"),
        }
    }
}

/// Ask `responder` for an answer, streaming only when both sides want it.
///
/// A streaming preference is ignored for responders that do not support
/// streaming, so those always answer in blocking mode.
pub async fn request(
    responder: &dyn Responder,
    prompt: &str,
    history: &[Turn],
    prefer_streaming: bool,
) -> Result<Reply> {
    if prefer_streaming && responder.supports_streaming() {
        let fragments = responder.get_response_stream(prompt, history).await?;
        Ok(Reply::Streaming(fragments))
    } else {
        let text = responder.get_response(prompt, history).await?;
        Ok(Reply::Blocking(text))
    }
}
