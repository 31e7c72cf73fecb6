// ABOUTME: Tests for TOML configuration loading and environment overrides.
// ABOUTME: Serialized because they mutate process environment variables.

use parley_core::config::Config;
use serial_test::serial;
use std::time::Duration;

const ENV_VARS: &[&str] = &[
    "PARLEY_CONFIG_PATH",
    "PARLEY_MAX_RETRIES",
    "PARLEY_RETRY_DELAY_MS",
    "PARLEY_STREAM",
    "PARLEY_BATCH_SIZE",
    "PARLEY_BIND",
    "PARLEY_RESPONDER",
    "PARLEY_METRICS",
];

fn clear_env() {
    for key in ENV_VARS {
        std::env::remove_var(key);
    }
}

fn write_config(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("parley.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
#[serial]
fn test_defaults_without_file() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("PARLEY_CONFIG_PATH", dir.path().join("missing.toml"));

    let config = Config::load(None).unwrap();
    assert_eq!(config.channel.max_retries, 3);
    assert_eq!(
        config.channel.retry_policy().retry_delay,
        Duration::from_secs(2)
    );
    assert_eq!(config.stream.batch_size, 5);
    assert!(!config.stream.enabled);
    assert_eq!(config.responder.responder_type(), "forwarder");
    assert!(!config.metrics.enabled);

    clear_env();
}

#[test]
#[serial]
fn test_load_from_file() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[channel]
max_retries = 0
retry_delay_ms = 250

[registry]
max_attempts = 2
send_timeout_ms = 1500

[stream]
enabled = true
batch_size = 3

[server]
bind = "0.0.0.0:9100"

[responder]
type = "fixed"
reply = "woof"

[metrics]
enabled = true
"#,
    );

    let config = Config::load(Some(&path)).unwrap();
    assert!(config.channel.retry_policy().is_unlimited());
    assert_eq!(config.channel.retry_delay_ms, 250);
    let broadcast = config.registry.broadcast_policy();
    assert_eq!(broadcast.retry.max_retries, 2);
    assert_eq!(broadcast.send_timeout, Duration::from_millis(1500));
    assert_eq!(config.server.bind, "0.0.0.0:9100");
    assert_eq!(config.responder.responder_type(), "fixed");
    assert_eq!(config.responder.to_json_value()["reply"], "woof");
    assert!(config.metrics.enabled);

    let orchestrator = config.orchestrator_config();
    assert!(orchestrator.stream);
    assert_eq!(orchestrator.batch_size, 3);
}

#[test]
#[serial]
fn test_config_path_env_is_searched() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[stream]\nbatch_size = 9\n");
    std::env::set_var("PARLEY_CONFIG_PATH", &path);

    let config = Config::load(None).unwrap();
    assert_eq!(config.stream.batch_size, 9);

    clear_env();
}

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[channel]\nmax_retries = 7\n");
    std::env::set_var("PARLEY_MAX_RETRIES", "1");
    std::env::set_var("PARLEY_STREAM", "yes");
    std::env::set_var("PARLEY_BIND", "127.0.0.1:4000");
    std::env::set_var("PARLEY_RESPONDER", "human");

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.channel.max_retries, 1);
    assert!(config.stream.enabled);
    assert_eq!(config.server.bind, "127.0.0.1:4000");
    assert_eq!(config.responder.responder_type(), "human");

    clear_env();
}

#[test]
#[serial]
fn test_invalid_env_value_is_rejected() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "");
    std::env::set_var("PARLEY_MAX_RETRIES", "lots");

    let err = Config::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("PARLEY_MAX_RETRIES"));

    clear_env();
}

#[test]
#[serial]
fn test_invalid_values_are_rejected() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();

    let zero_batch = write_config(&dir, "[stream]\nbatch_size = 0\n");
    assert!(Config::load(Some(&zero_batch)).is_err());

    let bad_bind = write_config(&dir, "[server]\nbind = \"not an address\"\n");
    assert!(Config::load(Some(&bad_bind)).is_err());

    let bad_type = write_config(&dir, "[channel]\nmax_retries = \"three\"\n");
    assert!(Config::load(Some(&bad_type)).is_err());
}

#[test]
#[serial]
fn test_explicit_missing_path_is_an_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load(Some(&dir.path().join("nope.toml"))).is_err());
}
