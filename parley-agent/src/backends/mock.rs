// ABOUTME: Mock responder for testing - returns pre-configured answers.
// ABOUTME: Allows deterministic orchestrator tests for blocking, streaming, and failing turns.
//!
//! # Example
//!
//! ```no_run
//! use parley_agent::backends::mock::MockResponder;
//! use parley_agent::Responder;
//!
//! # async fn example() {
//! let mock = MockResponder::new()
//!     .on_prompt("hello").respond_text("Hi there!")
//!     .on_prompt("story").respond_stream(&["Once ", "upon ", "a time"])
//!     .on_prompt("boom").respond_error("backend unavailable");
//!
//! let answer = mock.get_response("hello", &[]).await.unwrap();
//! assert_eq!(answer, "Hi there!");
//! # }
//! ```

use crate::conversation::Turn;
use crate::traits::{FragmentStream, Responder};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Mock responder for testing
#[derive(Clone)]
pub struct MockResponder {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    streaming: bool,
}

#[derive(Clone)]
struct Expectation {
    pattern: String,
    outcome: Outcome,
}

#[derive(Clone)]
enum Outcome {
    Fragments(Vec<String>),
    Fail(String),
    FailMidStream { fragments: Vec<String>, message: String },
}

impl MockResponder {
    /// Create a new mock responder with no expectations; streaming is supported
    pub fn new() -> Self {
        Self {
            expectations: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            streaming: true,
        }
    }

    /// Toggle whether the mock advertises streaming support
    pub fn streaming(mut self, enabled: bool) -> Self {
        self.streaming = enabled;
        self
    }

    /// Set up an expectation for a prompt containing the given pattern
    pub fn on_prompt(self, pattern: &str) -> ExpectationBuilder {
        ExpectationBuilder {
            responder: self,
            pattern: pattern.to_string(),
        }
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Match expectations with FIFO preference: the front entry wins when it
    /// matches, otherwise the first matching entry anywhere in the queue.
    fn take(&self, prompt: &str) -> Outcome {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        let mut exp = self.expectations.lock().unwrap_or_else(|e| e.into_inner());
        let index = match exp.front() {
            Some(front) if prompt.contains(&front.pattern) => Some(0),
            Some(_) => exp.iter().position(|e| prompt.contains(&e.pattern)),
            None => None,
        };
        index
            .and_then(|i| exp.remove(i))
            .map(|e| e.outcome)
            .unwrap_or_else(|| {
                Outcome::Fragments(vec![format!("Mock: no expectation for '{}'", prompt)])
            })
    }
}

impl Default for MockResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Responder for MockResponder {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_response(&self, prompt: &str, _history: &[Turn]) -> Result<String> {
        match self.take(prompt) {
            Outcome::Fragments(fragments) => Ok(fragments.concat()),
            Outcome::Fail(message) | Outcome::FailMidStream { message, .. } => {
                Err(anyhow!(message))
            }
        }
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn get_response_stream(&self, prompt: &str, _history: &[Turn]) -> Result<FragmentStream> {
        match self.take(prompt) {
            Outcome::Fragments(fragments) => {
                Ok(Box::pin(stream::iter(
                    fragments.into_iter().map(Ok::<String, anyhow::Error>),
                )))
            }
            Outcome::Fail(message) => Err(anyhow!(message)),
            Outcome::FailMidStream { fragments, message } => {
                let items: Vec<Result<String>> = fragments
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(anyhow!(message))))
                    .collect();
                Ok(Box::pin(stream::iter(items)))
            }
        }
    }
}

/// Builder for setting up mock expectations with a fluent API
pub struct ExpectationBuilder {
    responder: MockResponder,
    pattern: String,
}

impl ExpectationBuilder {
    fn push(self, outcome: Outcome) -> MockResponder {
        self.responder
            .expectations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Expectation {
                pattern: self.pattern,
                outcome,
            });
        self.responder
    }

    /// Respond with a complete answer (streamed as a single fragment)
    pub fn respond_text(self, text: &str) -> MockResponder {
        self.push(Outcome::Fragments(vec![text.to_string()]))
    }

    /// Respond with the given fragments
    pub fn respond_stream(self, fragments: &[&str]) -> MockResponder {
        self.push(Outcome::Fragments(
            fragments.iter().map(|f| f.to_string()).collect(),
        ))
    }

    /// Fail the call outright
    pub fn respond_error(self, message: &str) -> MockResponder {
        self.push(Outcome::Fail(message.to_string()))
    }

    /// Yield some fragments, then fail the stream
    pub fn respond_stream_then_fail(self, fragments: &[&str], message: &str) -> MockResponder {
        self.push(Outcome::FailMidStream {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            message: message.to_string(),
        })
    }
}
