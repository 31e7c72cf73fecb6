// ABOUTME: Subprocess transport: reads the child's stdout lines, writes JSON lines to its stdin.
// ABOUTME: Reconnecting respawns the command, so a crashed questioner script is restarted.

use async_trait::async_trait;
use parley_core::{Transport, TransportError};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

pub struct PipeTransport {
    argv: Vec<String>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<BufReader<ChildStdout>>,
}

impl PipeTransport {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            child: None,
            stdin: None,
            stdout: None,
        }
    }

    async fn reap(&mut self) {
        self.stdin = None;
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                tracing::debug!(command = %self.describe(), error = %e, "Failed to kill child");
            }
        }
    }
}

#[async_trait]
impl Transport for PipeTransport {
    fn describe(&self) -> String {
        self.argv.join(" ")
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        self.reap().await;

        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| TransportError::Connect("no command given".to_string()))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TransportError::Connect(format!("failed to spawn {}: {}", program, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Connect("child stdout unavailable".to_string()))?;
        self.stdin = child.stdin.take();
        self.stdout = Some(BufReader::new(stdout));
        self.child = Some(child);

        tracing::debug!(command = %self.describe(), "Spawned subprocess");
        Ok(())
    }

    async fn recv(&mut self) -> Result<String, TransportError> {
        let stdout = self
            .stdout
            .as_mut()
            .ok_or_else(|| TransportError::Closed("process not running".to_string()))?;
        let mut line = Vec::new();
        if stdout.read_until(b'\n', &mut line).await? == 0 {
            return Err(TransportError::Closed("process closed its stdout".to_string()));
        }
        // Undecodable bytes become U+FFFD
        let text = String::from_utf8_lossy(&line);
        Ok(text.trim_end_matches(['\r', '\n']).to_string())
    }

    async fn send(&mut self, frame: &str) -> Result<(), TransportError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| TransportError::Closed("process not running".to_string()))?;
        stdin.write_all(frame.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.reap().await;
        Ok(())
    }
}
