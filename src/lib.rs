// ABOUTME: Library root for the parley binary: transports, server, client relay, and terminal UI.
// ABOUTME: The conversation machinery itself lives in parley-core and parley-agent.

pub mod client;
pub mod logging;
pub mod server;
pub mod transport;
pub mod ui;

// Re-export platform-agnostic modules from parley-core
pub use parley_core::config;
pub use parley_core::metrics;
pub use parley_core::paths;

// Re-export parley-agent types for convenience
pub use parley_agent::{Responder, ResponderConfig, ResponderRegistry};

/// Shown once when any session ends, however it ended
pub const CONCLUDED: &str = "The conversation has concluded. Thank you.";
