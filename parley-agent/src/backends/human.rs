// ABOUTME: Human responder - asks the local operator to type each answer.
// ABOUTME: Reads one line per prompt from stdin (or any async reader in tests).

use crate::conversation::Turn;
use crate::traits::Responder;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

const ANSWER_PROMPT: &str = "Your answer: ";

type LineSource = Box<dyn AsyncBufRead + Send + Unpin>;

/// Blocking-only responder backed by a human at the terminal
pub struct HumanResponder {
    input: Mutex<LineSource>,
    show_prompt: bool,
}

impl HumanResponder {
    /// Read answers from the process's stdin
    pub fn stdin() -> Self {
        Self {
            input: Mutex::new(Box::new(BufReader::new(tokio::io::stdin()))),
            show_prompt: true,
        }
    }

    /// Read answers from an arbitrary line source without printing a prompt
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        Self {
            input: Mutex::new(Box::new(reader)),
            show_prompt: false,
        }
    }

    /// Factory function for the registry
    pub fn factory() -> crate::registry::ResponderFactory {
        Box::new(|_config| Ok(Arc::new(HumanResponder::stdin()) as Arc<dyn Responder>))
    }
}

#[async_trait]
impl Responder for HumanResponder {
    fn name(&self) -> &'static str {
        "human"
    }

    async fn get_response(&self, _prompt: &str, _history: &[Turn]) -> Result<String> {
        if self.show_prompt {
            let mut out = tokio::io::stdout();
            out.write_all(ANSWER_PROMPT.as_bytes())
                .await
                .context("Failed to write answer prompt")?;
            out.flush().await.context("Failed to flush answer prompt")?;
        }

        let mut line = String::new();
        let read = self
            .input
            .lock()
            .await
            .read_line(&mut line)
            .await
            .context("Failed to read answer")?;
        if read == 0 {
            bail!("No more input from the operator");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}
