// ABOUTME: Built-in responders (forwarder, fixed reply, human prompt, scripted mock).
// ABOUTME: Each responder implements the Responder trait.

pub mod fixed;
pub mod forwarder;
pub mod human;
pub mod mock;
