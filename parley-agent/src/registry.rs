// ABOUTME: Name-to-factory table used to pick the server's responder at startup.
// ABOUTME: Lookups ignore case and surrounding whitespace; unknown names list what is available.

use crate::config::ResponderConfig;
use crate::traits::Responder;
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds a responder from the free-form options of a `[responder]` section
pub type ResponderFactory = Box<dyn Fn(&Value) -> Result<Arc<dyn Responder>> + Send + Sync>;

pub struct ResponderRegistry {
    factories: BTreeMap<String, ResponderFactory>,
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

impl ResponderRegistry {
    /// A registry with nothing registered
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Add `factory` under `name`; a later registration of the same name wins
    pub fn register<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&Value) -> Result<Arc<dyn Responder>> + Send + Sync + 'static,
    {
        let key = normalize(name);
        if self.factories.insert(key.clone(), Box::new(factory)).is_some() {
            tracing::debug!(responder = %key, "Replaced responder factory");
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&normalize(name))
    }

    pub fn create(&self, name: &str, options: &Value) -> Result<Arc<dyn Responder>> {
        let Some(factory) = self.factories.get(&normalize(name)) else {
            bail!(
                "Unknown responder '{}' (available: {})",
                name,
                self.available().join(", ")
            );
        };
        factory(options).with_context(|| format!("Invalid options for responder '{}'", name))
    }

    /// Registered names in sorted order
    pub fn available(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn create_from_config(&self, config: &ResponderConfig) -> Result<Arc<dyn Responder>> {
        let responder = self.create(config.responder_type(), &config.to_json_value())?;
        tracing::info!(responder = responder.name(), "Responder ready");
        Ok(responder)
    }
}

impl Default for ResponderRegistry {
    /// The built-in responders: forwarder, fixed and human
    fn default() -> Self {
        use crate::backends::fixed::FixedResponder;
        use crate::backends::forwarder::ForwarderResponder;
        use crate::backends::human::HumanResponder;

        Self::new()
            .register("forwarder", ForwarderResponder::factory())
            .register("fixed", FixedResponder::factory())
            .register("human", HumanResponder::factory())
    }
}
