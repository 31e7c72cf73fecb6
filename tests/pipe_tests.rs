// ABOUTME: Subprocess transport tests using small shell commands as the questioner.
// ABOUTME: Covers line framing, writes reaching the child, and respawning after the child exits.

#![cfg(unix)]

use parley::transport::PipeTransport;
use parley_core::validate::Inbound;
use parley_core::{Channel, EndCause, Envelope, EnvelopeSink, ResilientChannel, RetryPolicy, Role};
use std::time::Duration;

fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

fn channel(argv: Vec<String>, attempts: u32) -> ResilientChannel<PipeTransport> {
    ResilientChannel::new(
        PipeTransport::new(argv),
        RetryPolicy::new(attempts, Duration::from_millis(10)),
    )
}

fn expect_message(inbound: Inbound) -> Envelope {
    match inbound {
        Inbound::Message(envelope) => envelope,
        Inbound::Invalid(error) => panic!("unexpected invalid input: {:?}", error),
    }
}

#[tokio::test]
async fn test_reads_json_and_plain_lines() {
    let mut channel = channel(
        sh(r#"echo '{"role":"Questioner","message":"structured","request_id":"p1"}'; echo plain words"#),
        1,
    );
    channel.start().await.unwrap();

    let first = expect_message(channel.read().await.unwrap());
    assert_eq!(first.text(), "structured");
    assert_eq!(first.request_id.as_str(), "p1");

    let second = expect_message(channel.read().await.unwrap());
    assert_eq!(second.role, Role::Questioner);
    assert_eq!(second.text(), "plain words");

    let end = channel.read().await.unwrap_err();
    assert!(matches!(end.cause, EndCause::RetriesExhausted { attempts: 1, .. }));
    channel.stop().await;
}

#[tokio::test]
async fn test_non_utf8_output_is_decoded_lossily() {
    let mut channel = channel(sh(r"printf 'caf\351\n'; echo after"), 3);
    channel.start().await.unwrap();

    let first = expect_message(channel.read().await.unwrap());
    assert_eq!(first.text(), "caf\u{FFFD}");

    // The child was not restarted, so its next line is still there
    let second = expect_message(channel.read().await.unwrap());
    assert_eq!(second.text(), "after");
    channel.stop().await;
}

#[tokio::test]
async fn test_crlf_line_endings_are_stripped() {
    let mut channel = channel(sh(r"printf 'windows\r\n'"), 1);
    channel.start().await.unwrap();

    assert_eq!(expect_message(channel.read().await.unwrap()).text(), "windows");
    channel.stop().await;
}

#[tokio::test]
async fn test_written_envelopes_reach_the_child() {
    let mut channel = channel(vec!["cat".to_string()], 1);
    channel.start().await.unwrap();

    let question = Envelope::chat(Role::Questioner, "echo me");
    channel.write(&question).await.unwrap();

    let echoed = expect_message(channel.read().await.unwrap());
    assert_eq!(echoed.text(), "echo me");
    assert_eq!(echoed.request_id, question.request_id);
    channel.stop().await;
}

#[tokio::test]
async fn test_exited_child_is_respawned() {
    let mut channel = channel(sh("echo again"), 2);
    channel.start().await.unwrap();

    assert_eq!(expect_message(channel.read().await.unwrap()).text(), "again");
    // EOF triggers one reconnect, which runs the command a second time
    assert_eq!(expect_message(channel.read().await.unwrap()).text(), "again");
    channel.stop().await;
}

#[tokio::test]
async fn test_missing_program_fails_to_start() {
    let mut channel = channel(vec!["/nonexistent/parley-questioner".to_string()], 2);
    let end = channel.start().await.unwrap_err();
    assert!(matches!(end.cause, EndCause::ConnectFailed { attempts: 2, .. }));
}
