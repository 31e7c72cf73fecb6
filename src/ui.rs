// ABOUTME: Plain terminal renderer: role-labelled lines, fragments printed as they arrive.
// ABOUTME: Writes to stdout and ignores write errors so a closed terminal never ends a session.

use parley_core::{Renderer, RequestId, Role};
use std::io::Write;

/// How each role is labelled on screen
#[derive(Debug, Clone)]
pub struct Labels {
    pub questioner: String,
    pub responder: String,
    pub server: String,
}

impl Labels {
    /// Labels as seen from a server answering remote questions
    pub fn server_side(responder_mode: &str) -> Self {
        Self {
            questioner: "Questioner (Client)".to_string(),
            responder: format!("Assistant ({}, Server)", responder_mode),
            server: "Server".to_string(),
        }
    }

    /// Labels as seen from a client asking a remote server
    pub fn client_side() -> Self {
        Self {
            questioner: "You".to_string(),
            responder: "Assistant (Server)".to_string(),
            server: "Server".to_string(),
        }
    }

    fn for_role(&self, role: Role) -> &str {
        match role {
            Role::Questioner => &self.questioner,
            Role::Responder => &self.responder,
            Role::Server => &self.server,
        }
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            questioner: Role::Questioner.to_string(),
            responder: Role::Responder.to_string(),
            server: Role::Server.to_string(),
        }
    }
}

pub struct TerminalRenderer {
    labels: Labels,
}

impl TerminalRenderer {
    pub fn new(labels: Labels) -> Self {
        Self { labels }
    }

    fn emit(&self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new(Labels::default())
    }
}

impl Renderer for TerminalRenderer {
    fn stream_started(&self, _request_id: &RequestId, role: Role, fragment: &str) {
        self.emit(&format!("{}: {}", self.labels.for_role(role), fragment));
    }

    fn stream_updated(&self, _request_id: &RequestId, fragment: &str) {
        self.emit(fragment);
    }

    fn stream_finished(&self, _request_id: &RequestId) {
        self.emit("\n");
    }

    fn message(&self, role: Role, text: &str) {
        self.emit(&format!("{}: {}\n", self.labels.for_role(role), text));
    }

    fn notice(&self, text: &str) {
        self.emit(&format!("\n== {} ==\n", text));
    }
}
