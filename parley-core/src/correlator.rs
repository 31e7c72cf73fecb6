// ABOUTME: Reassembles partial envelopes sharing a request_id into one logical message.
// ABOUTME: Owned by a single connection loop and cleared when that loop ends.

use crate::envelope::{Envelope, RequestId, Role};
use std::collections::HashMap;

/// Result of feeding one chat envelope to the [`Correlator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
    /// A fragment arrived; the message is still in progress
    Continue {
        request_id: RequestId,
        role: Role,
        fragment: String,
        /// True when this fragment opened the stream
        opened: bool,
    },
    /// The message is complete
    Complete {
        request_id: RequestId,
        role: Role,
        text: String,
        /// True when fragments were shown before completion
        streamed: bool,
    },
}

#[derive(Debug)]
struct Pending {
    role: Role,
    fragments: Vec<String>,
}

/// In-progress messages keyed by request_id
#[derive(Debug, Default)]
pub struct Correlator {
    pending: HashMap<RequestId, Pending>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, envelope: &Envelope) -> Correlation {
        let request_id = envelope.request_id.clone();
        let text = envelope.text().to_string();

        if envelope.partial {
            let opened = !self.pending.contains_key(&request_id);
            let entry = self.pending.entry(request_id.clone()).or_insert_with(|| Pending {
                role: envelope.role,
                fragments: Vec::new(),
            });
            entry.fragments.push(text.clone());
            return Correlation::Continue {
                request_id,
                role: entry.role,
                fragment: text,
                opened,
            };
        }

        match self.pending.remove(&request_id) {
            Some(mut entry) => {
                entry.fragments.push(text);
                tracing::trace!(request_id = %request_id, fragments = entry.fragments.len(), "Reassembled message");
                Correlation::Complete {
                    request_id,
                    role: entry.role,
                    text: entry.fragments.concat(),
                    streamed: true,
                }
            }
            None => Correlation::Complete {
                request_id,
                role: envelope.role,
                text,
                streamed: false,
            },
        }
    }

    /// Drop one in-progress message; true when it existed
    pub fn purge(&mut self, request_id: &RequestId) -> bool {
        self.pending.remove(request_id).is_some()
    }

    /// Drop every in-progress message, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
