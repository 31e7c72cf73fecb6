// ABOUTME: Tests for responder lookup by name and creation from config.
// ABOUTME: Covers built-ins, case-insensitive names, unknown names, and custom registrations.

use parley_agent::backends::mock::MockResponder;
use parley_agent::{Responder, ResponderConfig, ResponderRegistry};
use serde_json::json;
use std::sync::Arc;

#[test]
fn test_default_registry_lists_builtin_responders() {
    let registry = ResponderRegistry::default();
    assert_eq!(registry.available(), vec!["fixed", "forwarder", "human"]);
}

#[test]
fn test_unknown_responder_is_an_error() {
    let registry = ResponderRegistry::default();
    let err = registry.create("llm", &json!({})).err().unwrap();
    assert_eq!(
        err.to_string(),
        "Unknown responder 'llm' (available: fixed, forwarder, human)"
    );
}

#[test]
fn test_names_ignore_case_and_whitespace() {
    let registry = ResponderRegistry::default();
    assert!(registry.contains(" Forwarder "));
    assert!(!registry.contains("llm"));
    let responder = registry.create("FIXED", &json!({"reply": "woof"})).unwrap();
    assert_eq!(responder.name(), "fixed");
}

#[test]
fn test_bad_options_name_the_responder() {
    let registry = ResponderRegistry::default();
    let err = registry.create("fixed", &json!({})).err().unwrap();
    assert_eq!(err.to_string(), "Invalid options for responder 'fixed'");
}

#[tokio::test]
async fn test_later_registration_replaces_earlier() {
    let registry = ResponderRegistry::default().register("Forwarder", |_config| {
        Ok(Arc::new(MockResponder::new().on_prompt("ping").respond_text("overridden"))
            as Arc<dyn Responder>)
    });
    assert_eq!(registry.available(), vec!["fixed", "forwarder", "human"]);
    let responder = registry.create("forwarder", &json!({})).unwrap();
    assert_eq!(responder.get_response("ping", &[]).await.unwrap(), "overridden");
}

#[tokio::test]
async fn test_create_forwarder_echoes_prompt() {
    let registry = ResponderRegistry::default();
    let responder = registry.create("forwarder", &json!({})).unwrap();
    assert_eq!(responder.name(), "forwarder");
    assert!(responder.supports_streaming());
    assert_eq!(responder.get_response("ping", &[]).await.unwrap(), "ping");
}

#[tokio::test]
async fn test_create_fixed_from_config() {
    let registry = ResponderRegistry::default();
    let config = ResponderConfig::new("fixed").with_option("reply", "woof");
    let responder = registry.create_from_config(&config).unwrap();
    assert_eq!(responder.get_response("anything", &[]).await.unwrap(), "woof");
}

#[tokio::test]
async fn test_custom_registration() {
    let registry = ResponderRegistry::new().register("mock", |_config| {
        Ok(Arc::new(MockResponder::new().on_prompt("hi").respond_text("hey")) as Arc<dyn Responder>)
    });
    let responder = registry.create("mock", &json!({})).unwrap();
    assert_eq!(responder.get_response("hi", &[]).await.unwrap(), "hey");
}
