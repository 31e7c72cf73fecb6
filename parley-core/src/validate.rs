// ABOUTME: Ingress validation turning raw frames into envelopes or field-level errors.
// ABOUTME: Plain text is wrapped as a questioner message; malformed JSON objects are rejected per field.

use crate::envelope::{Envelope, FieldError, MessageType, RequestId, Role};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

const VALIDATION_REPLY: &str = "Validation error: One or more fields are invalid.";
const PLAIN_TEXT_REPLY: &str = "Invalid message. Please send a non-empty message.";

/// Rejected inbound payload. The connection stays open and gets a reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("envelope {request_id} failed validation ({} field error(s))", .errors.len())]
pub struct ValidationError {
    /// Echoed from the payload when it carried a usable one
    pub request_id: RequestId,
    /// Whether the payload was a JSON object (false for plain text)
    pub structured: bool,
    pub errors: Vec<FieldError>,
}

/// What to send back for a rejected payload
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationReply {
    Structured(Envelope),
    PlainText(String),
}

impl ValidationError {
    pub fn reply(&self) -> ValidationReply {
        if self.structured {
            ValidationReply::Structured(
                Envelope::chat(Role::Server, VALIDATION_REPLY)
                    .with_request_id(self.request_id.clone())
                    .with_errors(self.errors.clone()),
            )
        } else {
            ValidationReply::PlainText(PLAIN_TEXT_REPLY.to_string())
        }
    }
}

/// How a channel treats payloads that are not JSON objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// Wrap plain text as a questioner chat message
    #[default]
    Lenient,
    /// Treat anything but a JSON object as a broken stream
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// One decoded inbound item
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Message(Envelope),
    Invalid(ValidationError),
}

/// Decode a raw frame under the given policy
pub fn decode(raw: &str, policy: DecodePolicy) -> Result<Inbound, DecodeError> {
    let outcome = match (serde_json::from_str::<Value>(raw), policy) {
        (Ok(Value::Object(map)), _) => validate_object(&map),
        (_, DecodePolicy::Lenient) => wrap_plain_text(raw),
        (Ok(other), DecodePolicy::Strict) => {
            return Err(DecodeError::Malformed(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )))
        }
        (Err(e), DecodePolicy::Strict) => return Err(DecodeError::Malformed(e.to_string())),
    };

    Ok(match outcome {
        Ok(envelope) => Inbound::Message(envelope),
        Err(error) => Inbound::Invalid(error),
    })
}

/// Validate a raw frame, wrapping anything that is not a JSON object as plain text
pub fn validate(raw: &str) -> Result<Envelope, ValidationError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => validate_object(&map),
        _ => wrap_plain_text(raw),
    }
}

fn wrap_plain_text(raw: &str) -> Result<Envelope, ValidationError> {
    if raw.trim().is_empty() {
        return Err(ValidationError {
            request_id: RequestId::generate(),
            structured: false,
            errors: vec![empty_message_error()],
        });
    }
    Ok(Envelope::chat(Role::Questioner, raw))
}

fn empty_message_error() -> FieldError {
    FieldError::new(
        "message",
        "value_error",
        "Non-partial chat messages must have non-empty 'message' content.",
    )
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Present and not null
fn field<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    map.get(name).filter(|v| !v.is_null())
}

fn validate_object(map: &Map<String, Value>) -> Result<Envelope, ValidationError> {
    let mut errors = Vec::new();

    let request_id = match field(map, "request_id") {
        None => RequestId::generate(),
        Some(Value::String(s)) if !s.trim().is_empty() => RequestId::from(s.as_str()),
        Some(_) => {
            errors.push(FieldError::new(
                "request_id",
                "type_error",
                "request_id must be a non-empty string",
            ));
            RequestId::generate()
        }
    };

    let role = match field(map, "role") {
        None => {
            errors.push(FieldError::new("role", "missing", "Field required"));
            None
        }
        Some(Value::String(s)) => {
            let role = Role::parse(s);
            if role.is_none() {
                errors.push(FieldError::new(
                    "role",
                    "enum",
                    "Input should be 'Questioner', 'Responder' or 'Server'",
                ));
            }
            role
        }
        Some(_) => {
            errors.push(FieldError::new("role", "type_error", "role must be a string"));
            None
        }
    };

    let kind = match field(map, "type") {
        None => MessageType::Chat,
        Some(Value::String(s)) => MessageType::parse(s).unwrap_or_else(|| {
            errors.push(FieldError::new(
                "type",
                "enum",
                "Input should be 'chat' or 'healthcheck'",
            ));
            MessageType::Chat
        }),
        Some(_) => {
            errors.push(FieldError::new("type", "type_error", "type must be a string"));
            MessageType::Chat
        }
    };

    let message = match field(map, "message") {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(FieldError::new(
                "message",
                "type_error",
                "message must be a string",
            ));
            None
        }
    };

    let partial = match field(map, "partial") {
        None => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            errors.push(FieldError::new(
                "partial",
                "type_error",
                "partial must be a boolean",
            ));
            false
        }
    };

    let timestamp = match field(map, "timestamp") {
        None => Utc::now(),
        Some(Value::String(s)) => match DateTime::parse_from_rfc3339(s) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(e) => {
                errors.push(FieldError::new(
                    "timestamp",
                    "datetime_parse",
                    format!("timestamp must be RFC 3339: {}", e),
                ));
                Utc::now()
            }
        },
        Some(_) => {
            errors.push(FieldError::new(
                "timestamp",
                "type_error",
                "timestamp must be an RFC 3339 string",
            ));
            Utc::now()
        }
    };

    let message_number = match field(map, "message_number") {
        None => None,
        Some(value) => match value.as_u64() {
            Some(n) => Some(n),
            None => {
                errors.push(FieldError::new(
                    "message_number",
                    "type_error",
                    "message_number must be a non-negative integer",
                ));
                None
            }
        },
    };

    // Server replies carry their own field errors; keep them when well formed
    let carried_errors = field(map, "errors")
        .and_then(|v| serde_json::from_value::<Vec<FieldError>>(v.clone()).ok())
        .unwrap_or_default();

    // An absent message on a non-partial chat closes a stream; an empty one is a mistake
    if kind == MessageType::Chat
        && !partial
        && message.as_deref().is_some_and(|m| m.trim().is_empty())
    {
        errors.push(empty_message_error());
    }

    match role {
        Some(role) if errors.is_empty() => Ok(Envelope {
            role,
            kind,
            message,
            partial,
            request_id,
            timestamp,
            message_number,
            errors: carried_errors,
        }),
        _ => Err(ValidationError {
            request_id,
            structured: true,
            errors,
        }),
    }
}
