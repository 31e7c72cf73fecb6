// ABOUTME: Tests for the client relay using in-memory channels on both sides.
// ABOUTME: Covers forwarding, exit, remote rendering, and which side ended the session.

use async_trait::async_trait;
use parley::client;
use parley::CONCLUDED;
use parley_core::validate::{validate, Inbound};
use parley_core::{
    Channel, ChannelState, EndCause, EndOfStream, Envelope, EnvelopeSink, RequestId, Renderer,
    Role, SessionEnd,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// What a scripted channel does once its items run out
#[derive(Clone, Copy)]
enum WhenDrained {
    Close,
    Hang,
    CloseAfter(Duration),
}

struct ScriptedChannel {
    items: VecDeque<Inbound>,
    drained: WhenDrained,
    readable: bool,
    fail_start: bool,
    written: Vec<Envelope>,
    stopped: bool,
}

impl ScriptedChannel {
    fn new(frames: &[&str], drained: WhenDrained) -> Self {
        Self {
            items: frames
                .iter()
                .map(|raw| match validate(raw) {
                    Ok(envelope) => Inbound::Message(envelope),
                    Err(error) => Inbound::Invalid(error),
                })
                .collect(),
            drained,
            readable: true,
            fail_start: false,
            written: Vec::new(),
            stopped: false,
        }
    }

    fn write_only() -> Self {
        Self {
            readable: false,
            ..Self::new(&[], WhenDrained::Hang)
        }
    }
}

#[async_trait]
impl EnvelopeSink for ScriptedChannel {
    async fn write(&mut self, envelope: &Envelope) -> Result<(), EndOfStream> {
        self.written.push(envelope.clone());
        Ok(())
    }
}

#[async_trait]
impl Channel for ScriptedChannel {
    async fn start(&mut self) -> Result<(), EndOfStream> {
        if self.fail_start {
            return Err(EndOfStream::new(EndCause::ConnectFailed {
                attempts: 1,
                last_error: "refused".to_string(),
            }));
        }
        Ok(())
    }

    async fn read(&mut self) -> Result<Inbound, EndOfStream> {
        if let Some(item) = self.items.pop_front() {
            return Ok(item);
        }
        match self.drained {
            WhenDrained::Close => Err(EndOfStream::closed()),
            WhenDrained::Hang => std::future::pending().await,
            WhenDrained::CloseAfter(delay) => {
                tokio::time::sleep(delay).await;
                Err(EndOfStream::closed())
            }
        }
    }

    async fn write_raw(&mut self, _frame: &str) -> Result<(), EndOfStream> {
        Ok(())
    }

    async fn stop(&mut self) {
        self.stopped = true;
    }

    fn can_read(&self) -> bool {
        self.readable
    }

    fn state(&self) -> ChannelState {
        if self.stopped {
            ChannelState::Stopped
        } else {
            ChannelState::Connected
        }
    }
}

#[derive(Default)]
struct RecordingRenderer {
    events: Mutex<Vec<String>>,
}

impl RecordingRenderer {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl Renderer for RecordingRenderer {
    fn stream_started(&self, _request_id: &RequestId, role: Role, fragment: &str) {
        self.push(format!("start {} {}", role, fragment));
    }

    fn stream_updated(&self, _request_id: &RequestId, fragment: &str) {
        self.push(format!("update {}", fragment));
    }

    fn stream_finished(&self, _request_id: &RequestId) {
        self.push("finish".to_string());
    }

    fn message(&self, role: Role, text: &str) {
        self.push(format!("message {} {}", role, text));
    }

    fn notice(&self, text: &str) {
        self.push(format!("notice {}", text));
    }
}

#[tokio::test]
async fn test_questions_are_forwarded_until_exit() {
    let mut input =
        ScriptedChannel::new(&["first", "second", "exit", "never sent"], WhenDrained::Close);
    let mut output = ScriptedChannel::write_only();
    let renderer = RecordingRenderer::default();

    let end = client::run(&mut input, &mut output, &renderer).await;

    assert_eq!(end, SessionEnd::Exit);
    let sent: Vec<&str> = output.written.iter().map(|e| e.text()).collect();
    assert_eq!(sent, vec!["first", "second"]);
    assert!(output.written.iter().all(|e| e.role == Role::Questioner));
    assert!(input.stopped && output.stopped);
    assert_eq!(renderer.events(), vec![format!("notice {}", CONCLUDED)]);
}

#[tokio::test]
async fn test_input_closing_ends_session() {
    let mut input = ScriptedChannel::new(&["only"], WhenDrained::Close);
    let mut output = ScriptedChannel::write_only();
    let renderer = RecordingRenderer::default();

    let end = client::run(&mut input, &mut output, &renderer).await;

    assert_eq!(end, SessionEnd::InboundClosed(EndOfStream::closed()));
    assert_eq!(output.written.len(), 1);
}

#[tokio::test]
async fn test_invalid_local_input_is_not_forwarded() {
    let mut input = ScriptedChannel::new(
        &[r#"{"role":"Questioner","message":"","partial":false}"#, "ok"],
        WhenDrained::Close,
    );
    let mut output = ScriptedChannel::write_only();
    let renderer = RecordingRenderer::default();

    client::run(&mut input, &mut output, &renderer).await;

    let sent: Vec<&str> = output.written.iter().map(|e| e.text()).collect();
    assert_eq!(sent, vec!["ok"]);
}

#[tokio::test(start_paused = true)]
async fn test_remote_stream_is_rendered_in_order() {
    let mut input = ScriptedChannel::new(&[], WhenDrained::CloseAfter(Duration::from_secs(1)));
    let mut output = ScriptedChannel::new(
        &[
            r#"{"role":"Responder","message":"Hel","partial":true,"request_id":"r1"}"#,
            r#"{"role":"Responder","message":"lo","partial":true,"request_id":"r1"}"#,
            r#"{"role":"Responder","partial":false,"request_id":"r1"}"#,
            r#"{"role":"Responder","message":"done","request_id":"r2"}"#,
            r#"{"role":"Server","type":"healthcheck","request_id":"hc"}"#,
        ],
        WhenDrained::Hang,
    );
    let renderer = RecordingRenderer::default();

    let end = client::run(&mut input, &mut output, &renderer).await;

    assert!(matches!(end, SessionEnd::InboundClosed(_)));
    assert_eq!(
        renderer.events(),
        vec![
            "start Responder Hel".to_string(),
            "update lo".to_string(),
            "finish".to_string(),
            "message Responder done".to_string(),
            format!("notice {}", CONCLUDED),
        ]
    );
}

#[tokio::test]
async fn test_validation_errors_from_remote_are_shown() {
    let mut input = ScriptedChannel::new(&[], WhenDrained::Hang);
    let mut output = ScriptedChannel::new(
        &[r#"{"role":"Server","message":"Validation error: One or more fields are invalid.","request_id":"bad","errors":[{"field":"message","kind":"empty","message":"must not be empty"}]}"#],
        WhenDrained::Close,
    );
    let renderer = RecordingRenderer::default();

    let end = client::run(&mut input, &mut output, &renderer).await;

    assert_eq!(end, SessionEnd::OutboundClosed(EndOfStream::closed()));
    let events = renderer.events();
    assert_eq!(
        events[0],
        "message Server Validation error: One or more fields are invalid."
    );
    assert_eq!(events[1], "notice message: must not be empty");
}

#[tokio::test]
async fn test_output_start_failure_stops_both_sides() {
    let mut input = ScriptedChannel::new(&["hello"], WhenDrained::Hang);
    let mut output = ScriptedChannel::write_only();
    output.fail_start = true;
    let renderer = RecordingRenderer::default();

    let end = client::run(&mut input, &mut output, &renderer).await;

    assert!(matches!(
        end,
        SessionEnd::OutboundClosed(EndOfStream {
            cause: EndCause::ConnectFailed { attempts: 1, .. }
        })
    ));
    assert!(output.written.is_empty());
    assert!(input.stopped && output.stopped);
    assert_eq!(renderer.events(), vec![format!("notice {}", CONCLUDED)]);
}
