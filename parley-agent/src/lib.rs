// ABOUTME: Pluggable responder abstraction for parley.
// ABOUTME: Provides the Responder trait, conversation history, and built-in responders.

pub mod config;
pub mod conversation;
pub mod registry;
pub mod traits;

pub mod backends;

pub use config::ResponderConfig;
pub use conversation::{Conversation, SharedConversation, Turn};
pub use registry::{ResponderFactory, ResponderRegistry};
pub use traits::{request, FragmentStream, Reply, Responder};
