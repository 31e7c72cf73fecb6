// ABOUTME: Wire envelope exchanged between questioner, responder, and server.
// ABOUTME: One JSON object per logical message or per fragment of a streamed message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Questioner,
    Responder,
    Server,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Questioner => "Questioner",
            Role::Responder => "Responder",
            Role::Server => "Server",
        }
    }

    /// Parse the wire spelling of a role
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Questioner" => Some(Role::Questioner),
            "Responder" => Some(Role::Responder),
            "Server" => Some(Role::Server),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope kind; liveness probes never reach the responder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Chat,
    Healthcheck,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Chat => "chat",
            MessageType::Healthcheck => "healthcheck",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "chat" => Some(MessageType::Chat),
            "healthcheck" => Some(MessageType::Healthcheck),
            _ => None,
        }
    }
}

/// Opaque correlation key shared by every fragment of one logical message
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Fresh UUID v4 identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One machine-readable validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub kind: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, kind: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            kind: kind.to_string(),
            message: message.into(),
        }
    }
}

/// One unit on the wire.
///
/// A non-partial chat envelope without `message` terminates a stream of
/// partial fragments that share its `request_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub role: Role,
    #[serde(rename = "type", default)]
    pub kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub partial: bool,
    #[serde(default = "RequestId::generate")]
    pub request_id: RequestId,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl Envelope {
    fn base(role: Role, kind: MessageType, request_id: RequestId) -> Self {
        Self {
            role,
            kind,
            message: None,
            partial: false,
            request_id,
            timestamp: Utc::now(),
            message_number: None,
            errors: Vec::new(),
        }
    }

    /// Complete chat message with a fresh request id
    pub fn chat(role: Role, message: impl Into<String>) -> Self {
        let mut envelope = Self::base(role, MessageType::Chat, RequestId::generate());
        envelope.message = Some(message.into());
        envelope
    }

    /// Partial chunk of a streamed message
    pub fn fragment(role: Role, text: impl Into<String>, request_id: RequestId) -> Self {
        let mut envelope = Self::base(role, MessageType::Chat, request_id);
        envelope.message = Some(text.into());
        envelope.partial = true;
        envelope
    }

    /// Terminal envelope closing a stream, carrying no text
    pub fn stream_end(role: Role, request_id: RequestId) -> Self {
        Self::base(role, MessageType::Chat, request_id)
    }

    pub fn healthcheck(role: Role, request_id: RequestId) -> Self {
        Self::base(role, MessageType::Healthcheck, request_id)
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_message_number(mut self, number: u64) -> Self {
        self.message_number = Some(number);
        self
    }

    pub fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = errors;
        self
    }

    /// Message text, empty when absent
    pub fn text(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }

    /// Whether this envelope asks to end the conversation
    pub fn is_exit(&self) -> bool {
        self.kind == MessageType::Chat && !self.partial && is_exit_text(self.text())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// `exit`, ignoring surrounding whitespace and case
pub fn is_exit_text(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("exit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_serializes_wire_names() {
        let envelope = Envelope::chat(Role::Questioner, "hi").with_request_id("r1".into());
        let value: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(value["role"], "Questioner");
        assert_eq!(value["type"], "chat");
        assert_eq!(value["message"], "hi");
        assert_eq!(value["partial"], false);
        assert_eq!(value["request_id"], "r1");
        assert!(value.get("errors").is_none());
        assert!(value.get("message_number").is_none());
    }

    #[test]
    fn test_stream_end_has_no_message() {
        let envelope = Envelope::stream_end(Role::Responder, "r1".into());
        let value: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        assert!(value.get("message").is_none());
        assert_eq!(value["partial"], false);
    }

    #[test]
    fn test_is_exit() {
        assert!(Envelope::chat(Role::Questioner, "  EXIT \n").is_exit());
        assert!(!Envelope::chat(Role::Questioner, "exit now").is_exit());
        assert!(!Envelope::fragment(Role::Questioner, "exit", "r".into()).is_exit());
    }

    #[test]
    fn test_role_parse_is_case_sensitive() {
        assert_eq!(Role::parse("Server"), Some(Role::Server));
        assert_eq!(Role::parse("server"), None);
    }
}
