// ABOUTME: Conversation loop: read, reassemble, ask the responder, emit the answer.
// ABOUTME: Handles validation replies, healthchecks, exit, and blocking or streamed answers.

use crate::channel::{Channel, EnvelopeSink};
use crate::correlator::{Correlation, Correlator};
use crate::envelope::{Envelope, RequestId, Role};
use crate::error::EndOfStream;
use crate::render::Renderer;
use crate::validate::{Inbound, ValidationReply};
use futures::StreamExt;
use parley_agent::{conversation, request, Reply, Responder, SharedConversation, Turn};
use std::sync::Arc;

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Prefer streamed answers when the responder supports them
    pub stream: bool,
    /// Fragments per partial envelope; a newline flushes early
    pub batch_size: usize,
    /// Role stamped on outgoing answers
    pub role: Role,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            stream: false,
            batch_size: 5,
            role: Role::Responder,
        }
    }
}

/// Why a conversation loop returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Either party sent an exit message
    Exit,
    InboundClosed(EndOfStream),
    OutboundClosed(EndOfStream),
}

/// Lifecycle of one logical request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Accumulating,
    Reassembled,
    Responding,
    Sent,
}

fn enter(request_id: &RequestId, phase: Phase) {
    tracing::trace!(request_id = %request_id, phase = ?phase, "Request phase");
}

/// Drives one conversation between an inbound channel and an outbound sink
pub struct Orchestrator {
    responder: Arc<dyn Responder>,
    conversation: SharedConversation,
    renderer: Arc<dyn Renderer>,
    correlator: Correlator,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        responder: Arc<dyn Responder>,
        conversation: SharedConversation,
        renderer: Arc<dyn Renderer>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            responder,
            conversation,
            renderer,
            correlator: Correlator::new(),
            config,
        }
    }

    /// Messages still being reassembled
    pub fn pending(&self) -> usize {
        self.correlator.len()
    }

    /// Run until exit or until either side ends its stream.
    ///
    /// In-progress messages are purged on every exit path.
    pub async fn run<C, S>(&mut self, inbound: &mut C, outbound: &mut S) -> SessionEnd
    where
        C: Channel + ?Sized,
        S: EnvelopeSink + ?Sized,
    {
        let end = self.run_loop(inbound, outbound).await;
        let purged = self.correlator.clear();
        if purged > 0 {
            tracing::debug!(purged, "Dropped unfinished messages");
        }
        tracing::info!(end = ?end, "Conversation loop ended");
        end
    }

    async fn run_loop<C, S>(&mut self, inbound: &mut C, outbound: &mut S) -> SessionEnd
    where
        C: Channel + ?Sized,
        S: EnvelopeSink + ?Sized,
    {
        loop {
            let envelope = match inbound.read().await {
                Ok(Inbound::Message(envelope)) => envelope,
                Ok(Inbound::Invalid(error)) => {
                    tracing::warn!(
                        request_id = %error.request_id,
                        structured = error.structured,
                        errors = error.errors.len(),
                        "Rejected invalid message"
                    );
                    let sent = match error.reply() {
                        ValidationReply::Structured(reply) => inbound.write(&reply).await,
                        ValidationReply::PlainText(text) => inbound.write_raw(&text).await,
                    };
                    if let Err(end) = sent {
                        return SessionEnd::InboundClosed(end);
                    }
                    continue;
                }
                Err(end) => return SessionEnd::InboundClosed(end),
            };

            if envelope.kind == crate::envelope::MessageType::Healthcheck {
                tracing::debug!(request_id = %envelope.request_id, "Healthcheck");
                let pong = Envelope::healthcheck(Role::Server, envelope.request_id.clone());
                if let Err(end) = inbound.write(&pong).await {
                    return SessionEnd::InboundClosed(end);
                }
                continue;
            }

            let (request_id, role, prompt) = match self.correlator.ingest(&envelope) {
                Correlation::Continue {
                    request_id,
                    role,
                    fragment,
                    opened,
                } => {
                    if opened {
                        enter(&request_id, Phase::Accumulating);
                        self.renderer.stream_started(&request_id, role, &fragment);
                    } else {
                        self.renderer.stream_updated(&request_id, &fragment);
                    }
                    continue;
                }
                Correlation::Complete {
                    request_id,
                    role,
                    text,
                    streamed,
                } => {
                    if streamed {
                        self.renderer.stream_finished(&request_id);
                    } else if !text.is_empty() {
                        self.renderer.message(role, &text);
                    }
                    (request_id, role, text)
                }
            };
            enter(&request_id, Phase::Reassembled);

            if crate::envelope::is_exit_text(&prompt) {
                tracing::info!(request_id = %request_id, "Exit requested");
                return SessionEnd::Exit;
            }
            if prompt.trim().is_empty() {
                tracing::debug!(request_id = %request_id, "Empty message, nothing to answer");
                continue;
            }

            let history = conversation::snapshot(&self.conversation);
            conversation::record(&self.conversation, role.as_str(), &prompt);

            enter(&request_id, Phase::Responding);
            let answer = match self.respond(&request_id, &prompt, &history, outbound).await {
                Ok(answer) => answer,
                Err(end) => return SessionEnd::OutboundClosed(end),
            };
            enter(&request_id, Phase::Sent);

            conversation::record(&self.conversation, self.config.role.as_str(), &answer);

            if crate::envelope::is_exit_text(&answer) {
                tracing::info!(request_id = %request_id, "Responder ended the conversation");
                return SessionEnd::Exit;
            }
        }
    }

    /// Ask the responder and emit its answer; returns the full answer text
    async fn respond<S>(
        &self,
        request_id: &RequestId,
        prompt: &str,
        history: &[Turn],
        outbound: &mut S,
    ) -> Result<String, EndOfStream>
    where
        S: EnvelopeSink + ?Sized,
    {
        let reply = match request(self.responder.as_ref(), prompt, history, self.config.stream).await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    request_id = %request_id,
                    responder = self.responder.name(),
                    error = %e,
                    "Responder failed, sending empty answer"
                );
                crate::metrics::record_responder_failure(self.responder.name());
                Reply::Blocking(String::new())
            }
        };

        match reply {
            Reply::Blocking(answer) => {
                let envelope = if answer.is_empty() {
                    Envelope::stream_end(self.config.role, request_id.clone())
                } else {
                    Envelope::chat(self.config.role, answer.clone())
                        .with_request_id(request_id.clone())
                };
                outbound.write(&envelope).await?;
                if !answer.is_empty() {
                    self.renderer.message(self.config.role, &answer);
                }
                Ok(answer)
            }
            Reply::Streaming(mut fragments) => {
                let batch_size = self.config.batch_size.max(1);
                let mut batch: Vec<String> = Vec::new();
                let mut answer = String::new();
                let mut sequence = 0u64;

                while let Some(item) = fragments.next().await {
                    match item {
                        Ok(fragment) => {
                            let newline = fragment.contains('\n');
                            batch.push(fragment);
                            if newline || batch.len() >= batch_size {
                                self.flush(request_id, &mut batch, &mut answer, &mut sequence, outbound)
                                    .await?;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(
                                request_id = %request_id,
                                responder = self.responder.name(),
                                error = %e,
                                "Responder stream failed, keeping partial answer"
                            );
                            crate::metrics::record_responder_failure(self.responder.name());
                            break;
                        }
                    }
                }
                self.flush(request_id, &mut batch, &mut answer, &mut sequence, outbound)
                    .await?;

                outbound
                    .write(&Envelope::stream_end(self.config.role, request_id.clone()))
                    .await?;
                if sequence > 0 {
                    self.renderer.stream_finished(request_id);
                }
                Ok(answer)
            }
        }
    }

    async fn flush<S>(
        &self,
        request_id: &RequestId,
        batch: &mut Vec<String>,
        answer: &mut String,
        sequence: &mut u64,
        outbound: &mut S,
    ) -> Result<(), EndOfStream>
    where
        S: EnvelopeSink + ?Sized,
    {
        let text = batch.concat();
        batch.clear();
        if text.is_empty() {
            return Ok(());
        }

        *sequence += 1;
        let envelope = Envelope::fragment(self.config.role, text.clone(), request_id.clone())
            .with_message_number(*sequence);
        outbound.write(&envelope).await?;

        if *sequence == 1 {
            self.renderer
                .stream_started(request_id, self.config.role, &text);
        } else {
            self.renderer.stream_updated(request_id, &text);
        }
        answer.push_str(&text);
        Ok(())
    }
}
