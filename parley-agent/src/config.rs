// ABOUTME: Responder selection config, the [responder] section of parley.toml.
// ABOUTME: A type discriminator plus free-form fields handed to the responder factory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Responder configuration with type discriminator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderConfig {
    /// Responder type: "forwarder", "fixed", "human"
    #[serde(rename = "type", default = "default_responder_type")]
    pub responder_type: String,

    /// Remaining fields passed to the responder factory
    #[serde(flatten)]
    pub options: toml::Table,
}

fn default_responder_type() -> String {
    "forwarder".to_string()
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            responder_type: default_responder_type(),
            options: toml::Table::new(),
        }
    }
}

impl ResponderConfig {
    pub fn new(responder_type: impl Into<String>) -> Self {
        Self {
            responder_type: responder_type.into(),
            options: toml::Table::new(),
        }
    }

    /// Set one option, replacing any previous value
    pub fn with_option(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    pub fn responder_type(&self) -> &str {
        &self.responder_type
    }

    /// Parse a standalone `[responder]` table
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse responder config TOML")
    }

    /// Convert the option table to a JSON value for the registry
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(&self.options).unwrap_or_else(|_| serde_json::json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fixed_responder() {
        let config = ResponderConfig::parse(
            r#"
type = "fixed"
reply = "woof"
"#,
        )
        .unwrap();
        assert_eq!(config.responder_type(), "fixed");
        assert_eq!(config.to_json_value()["reply"], "woof");
    }

    #[test]
    fn test_type_defaults_to_forwarder() {
        let config = ResponderConfig::parse("").unwrap();
        assert_eq!(config.responder_type(), "forwarder");
        assert_eq!(config.to_json_value(), serde_json::json!({}));
    }
}
