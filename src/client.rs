// ABOUTME: Client relay: forwards local questions to the output and shows what comes back.
// ABOUTME: Both directions run in one task through tokio::select! over cancel-safe reads.

use crate::CONCLUDED;
use parley_core::validate::Inbound;
use parley_core::{
    Channel, Correlation, Correlator, Envelope, MessageType, Renderer, SessionEnd,
};

/// Start both channels, relay until either side ends, then stop both
pub async fn run<I, O>(input: &mut I, output: &mut O, renderer: &dyn Renderer) -> SessionEnd
where
    I: Channel + ?Sized,
    O: Channel + ?Sized,
{
    let end = match (input.start().await, output.start().await) {
        (Err(end), _) => SessionEnd::InboundClosed(end),
        (_, Err(end)) => SessionEnd::OutboundClosed(end),
        (Ok(()), Ok(())) => relay(input, output, renderer).await,
    };

    input.stop().await;
    output.stop().await;
    tracing::info!(end = ?end, "Client session ended");
    renderer.notice(CONCLUDED);
    end
}

/// Relay local input to the output; render remote messages when the output is readable
pub async fn relay<I, O>(input: &mut I, output: &mut O, renderer: &dyn Renderer) -> SessionEnd
where
    I: Channel + ?Sized,
    O: Channel + ?Sized,
{
    let remote_readable = output.can_read();
    let mut correlator = Correlator::new();

    // A read dropped by select! keeps its spent retry attempts on the channel
    let end = loop {
        tokio::select! {
            local = input.read() => match local {
                Ok(Inbound::Message(envelope)) => {
                    if envelope.is_exit() {
                        break SessionEnd::Exit;
                    }
                    if let Err(end) = output.write(&envelope).await {
                        break SessionEnd::OutboundClosed(end);
                    }
                }
                Ok(Inbound::Invalid(error)) => {
                    tracing::debug!(request_id = %error.request_id, "Ignoring invalid local input");
                }
                Err(end) => break SessionEnd::InboundClosed(end),
            },
            remote = output.read(), if remote_readable => match remote {
                Ok(Inbound::Message(envelope)) => show_remote(&envelope, &mut correlator, renderer),
                Ok(Inbound::Invalid(error)) => {
                    tracing::warn!(request_id = %error.request_id, "Dropping invalid message from remote");
                }
                Err(end) => break SessionEnd::OutboundClosed(end),
            },
        }
    };

    correlator.clear();
    end
}

fn show_remote(envelope: &Envelope, correlator: &mut Correlator, renderer: &dyn Renderer) {
    if envelope.kind == MessageType::Healthcheck {
        tracing::debug!(request_id = %envelope.request_id, "Healthcheck reply");
        return;
    }

    match correlator.ingest(envelope) {
        Correlation::Continue {
            request_id,
            role,
            fragment,
            opened,
        } => {
            if opened {
                renderer.stream_started(&request_id, role, &fragment);
            } else {
                renderer.stream_updated(&request_id, &fragment);
            }
        }
        Correlation::Complete {
            request_id,
            streamed: true,
            ..
        } => renderer.stream_finished(&request_id),
        Correlation::Complete { role, text, .. } => {
            if !text.is_empty() {
                renderer.message(role, &text);
            }
            for error in &envelope.errors {
                renderer.notice(&format!("{}: {}", error.field, error.message));
            }
        }
    }
}
