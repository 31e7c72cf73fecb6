// ABOUTME: Conversation history passed to responders with every prompt.
// ABOUTME: Ordered (role, content) turns; shared between tasks behind a plain mutex.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// One exchanged message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Lower-cased speaker role (e.g. "questioner", "responder")
    pub role: String,
    pub content: String,
}

/// In-memory transcript of a conversation.
///
/// Never persisted; a restart starts from an empty history.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

/// Conversation shared by the tasks of one process. The lock is only held for
/// push/snapshot, never across an await.
pub type SharedConversation = Arc<Mutex<Conversation>>;

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedConversation {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Append a turn; the role is stored lower-cased
    pub fn add_message(&mut self, role: &str, content: impl Into<String>) {
        self.turns.push(Turn {
            role: role.to_lowercase(),
            content: content.into(),
        });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Push a turn into a shared conversation, recovering from a poisoned lock
pub fn record(conversation: &SharedConversation, role: &str, content: &str) {
    conversation
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .add_message(role, content);
}

/// Copy the current turns out of a shared conversation
pub fn snapshot(conversation: &SharedConversation) -> Vec<Turn> {
    conversation
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .turns()
        .to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_message_lowercases_role() {
        let mut conversation = Conversation::new();
        conversation.add_message("Questioner", "hello");
        conversation.add_message("Responder", "hi");

        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.turns()[0].role, "questioner");
        assert_eq!(conversation.turns()[1].content, "hi");
    }

    #[test]
    fn test_shared_record_and_snapshot() {
        let shared = Conversation::shared();
        record(&shared, "Questioner", "ping");
        let turns = snapshot(&shared);
        assert_eq!(
            turns,
            vec![Turn {
                role: "questioner".to_string(),
                content: "ping".to_string()
            }]
        );
    }
}
