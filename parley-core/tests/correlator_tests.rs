// ABOUTME: Tests for reassembling streamed fragments into complete messages.
// ABOUTME: Checks ordering, interleaved request ids, and purge behavior.

use parley_core::{Correlation, Correlator, Envelope, RequestId, Role};

fn fragment(text: &str, id: &str) -> Envelope {
    Envelope::fragment(Role::Responder, text, RequestId::from(id))
}

#[test]
fn test_fragments_complete_once_in_arrival_order() {
    let mut correlator = Correlator::new();

    match correlator.ingest(&fragment("Hel", "r1")) {
        Correlation::Continue { fragment, opened, role, .. } => {
            assert_eq!(fragment, "Hel");
            assert!(opened);
            assert_eq!(role, Role::Responder);
        }
        other => panic!("Expected Continue, got {:?}", other),
    }
    match correlator.ingest(&fragment("lo", "r1")) {
        Correlation::Continue { opened, .. } => assert!(!opened),
        other => panic!("Expected Continue, got {:?}", other),
    }

    let done = correlator.ingest(&Envelope::stream_end(Role::Responder, "r1".into()));
    assert_eq!(
        done,
        Correlation::Complete {
            request_id: "r1".into(),
            role: Role::Responder,
            text: "Hello".to_string(),
            streamed: true,
        }
    );
    assert!(correlator.is_empty());

    // A second terminator finds nothing and completes with its own (empty) content
    match correlator.ingest(&Envelope::stream_end(Role::Responder, "r1".into())) {
        Correlation::Complete { text, streamed, .. } => {
            assert_eq!(text, "");
            assert!(!streamed);
        }
        other => panic!("Expected Complete, got {:?}", other),
    }
}

#[test]
fn test_terminal_fragment_content_is_appended() {
    let mut correlator = Correlator::new();
    correlator.ingest(&fragment("a", "r"));
    let terminal = Envelope::chat(Role::Responder, "b").with_request_id("r".into());
    match correlator.ingest(&terminal) {
        Correlation::Complete { text, .. } => assert_eq!(text, "ab"),
        other => panic!("Expected Complete, got {:?}", other),
    }
}

#[test]
fn test_interleaved_requests_stay_separate() {
    let mut correlator = Correlator::new();
    correlator.ingest(&fragment("one-", "a"));
    correlator.ingest(&fragment("two-", "b"));
    correlator.ingest(&fragment("1", "a"));
    assert_eq!(correlator.len(), 2);

    match correlator.ingest(&Envelope::stream_end(Role::Responder, "b".into())) {
        Correlation::Complete { text, .. } => assert_eq!(text, "two-"),
        other => panic!("Expected Complete, got {:?}", other),
    }
    match correlator.ingest(&Envelope::stream_end(Role::Responder, "a".into())) {
        Correlation::Complete { text, .. } => assert_eq!(text, "one-1"),
        other => panic!("Expected Complete, got {:?}", other),
    }
}

#[test]
fn test_unseen_complete_message_passes_through() {
    let mut correlator = Correlator::new();
    let envelope = Envelope::chat(Role::Questioner, "hi there");
    match correlator.ingest(&envelope) {
        Correlation::Complete { text, role, streamed, .. } => {
            assert_eq!(text, "hi there");
            assert_eq!(role, Role::Questioner);
            assert!(!streamed);
        }
        other => panic!("Expected Complete, got {:?}", other),
    }
    assert!(correlator.is_empty());
}

#[test]
fn test_purge_and_clear() {
    let mut correlator = Correlator::new();
    correlator.ingest(&fragment("x", "a"));
    correlator.ingest(&fragment("y", "b"));
    correlator.ingest(&fragment("z", "c"));

    assert!(correlator.purge(&"a".into()));
    assert!(!correlator.purge(&"a".into()));
    assert_eq!(correlator.clear(), 2);
    assert!(correlator.is_empty());
}
