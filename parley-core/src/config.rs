// ABOUTME: Configuration parsing from TOML file with environment variable overrides.
// ABOUTME: Every section has defaults, so an absent file yields a working configuration.

use crate::orchestrator::OrchestratorConfig;
use crate::paths;
use crate::registry::BroadcastPolicy;
use crate::retry::RetryPolicy;
use anyhow::{bail, Context, Result};
use parley_agent::ResponderConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub responder: ResponderConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Reconnect budget for client channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Total attempts per operation (0 = unlimited)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl ChannelConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_delay_ms))
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

/// Per-recipient delivery budget for server broadcasts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_max_retries")]
    pub max_attempts: u32,
    #[serde(default = "default_broadcast_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_retries(),
            retry_delay_ms: default_broadcast_delay_ms(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

impl RegistryConfig {
    pub fn broadcast_policy(&self) -> BroadcastPolicy {
        BroadcastPolicy {
            retry: RetryPolicy::new(self.max_attempts, Duration::from_millis(self.retry_delay_ms)),
            send_timeout: Duration::from_millis(self.send_timeout_ms),
        }
    }
}

fn default_broadcast_delay_ms() -> u64 {
    500
}

fn default_send_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Fragments per partial envelope
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            batch_size: default_batch_size(),
        }
    }
}

fn default_batch_size() -> usize {
    5
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Serve Prometheus text at /metrics
    #[serde(default)]
    pub enabled: bool,
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("{} must be a boolean, got: {}", name, value),
    }
}

impl Config {
    /// Find the config file, checking multiple locations in order:
    /// 1. PARLEY_CONFIG_PATH env var (if set)
    /// 2. ./parley.toml
    /// 3. ~/.config/parley/parley.toml
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(env_path) = std::env::var("PARLEY_CONFIG_PATH") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
        }

        let local_config = PathBuf::from("parley.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        let xdg_config = paths::config_file();
        if xdg_config.exists() {
            return Some(xdg_config);
        }

        None
    }

    /// Load configuration with environment variable overrides.
    /// An explicit `path` must exist; otherwise the usual locations are searched.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let found = match path {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file {} does not exist", path.display());
                }
                Some(path.to_path_buf())
            }
            None => Self::find_config_file(),
        };

        let mut config = match found {
            Some(config_path) => {
                tracing::info!(path = %config_path.display(), "Loading configuration from file");
                let content = std::fs::read_to_string(&config_path)
                    .with_context(|| format!("Failed to read {}", config_path.display()))?;
                Self::from_toml_str(&content)
                    .with_context(|| format!("Failed to parse {}", config_path.display()))?
            }
            None => {
                tracing::debug!("No config file found, using environment variables and defaults");
                Config::default()
            }
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("PARLEY_MAX_RETRIES") {
            self.channel.max_retries = val.parse().with_context(|| {
                format!("PARLEY_MAX_RETRIES must be a non-negative integer, got: {}", val)
            })?;
        }
        if let Ok(val) = std::env::var("PARLEY_RETRY_DELAY_MS") {
            self.channel.retry_delay_ms = val.parse().with_context(|| {
                format!("PARLEY_RETRY_DELAY_MS must be a number of milliseconds, got: {}", val)
            })?;
        }
        if let Ok(val) = std::env::var("PARLEY_STREAM") {
            self.stream.enabled = parse_bool("PARLEY_STREAM", &val)?;
        }
        if let Ok(val) = std::env::var("PARLEY_BATCH_SIZE") {
            self.stream.batch_size = val.parse().with_context(|| {
                format!("PARLEY_BATCH_SIZE must be a positive integer, got: {}", val)
            })?;
        }
        if let Ok(val) = std::env::var("PARLEY_BIND") {
            self.server.bind = val;
        }
        if let Ok(val) = std::env::var("PARLEY_RESPONDER") {
            self.responder.responder_type = val;
        }
        if let Ok(val) = std::env::var("PARLEY_METRICS") {
            self.metrics.enabled = parse_bool("PARLEY_METRICS", &val)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.stream.batch_size == 0 {
            bail!("stream.batch_size must be at least 1");
        }
        if self.registry.max_attempts == 0 {
            bail!("registry.max_attempts must be at least 1");
        }
        if self.registry.send_timeout_ms == 0 {
            bail!("registry.send_timeout_ms must be positive");
        }
        self.server
            .bind
            .parse::<std::net::SocketAddr>()
            .with_context(|| format!("server.bind must be host:port, got: {}", self.server.bind))?;
        Ok(())
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            stream: self.stream.enabled,
            batch_size: self.stream.batch_size,
            ..OrchestratorConfig::default()
        }
    }
}
