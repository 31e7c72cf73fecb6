// ABOUTME: Byte-level transports and the builders that turn CLI choices into channels.
// ABOUTME: Local stdio channels never reconnect; network and subprocess channels use the retry budget.

pub mod accepted;
pub mod pipe;
pub mod stdout;
pub mod terminal;
pub mod websocket;

use crate::ui::Labels;
use anyhow::{bail, Result};
use clap::ValueEnum;
use parley_core::{Channel, ResilientChannel, RetryPolicy};
use std::time::Duration;

pub use accepted::{AcceptedConnection, AcceptedTransport};
pub use pipe::PipeTransport;
pub use stdout::StdoutTransport;
pub use terminal::TerminalTransport;
pub use websocket::WebSocketTransport;

/// Where questions come from in client mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputKind {
    /// Typed at the terminal
    Human,
    /// Lines printed by a subprocess (`--cmd`)
    #[value(alias = "stdin")]
    Pipe,
    /// Frames from a websocket server
    Websocket,
}

/// Where the conversation goes in client mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputKind {
    /// Rendered on the terminal
    Human,
    /// JSON lines on stdout
    Stdout,
    /// A parley server, whose answers are shown locally
    Websocket,
}

/// Everything the builders need besides the kind
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    pub cmd: Vec<String>,
    pub input_ws_uri: String,
    pub output_ws_uri: String,
    pub retry: RetryPolicy,
}

fn local_policy() -> RetryPolicy {
    RetryPolicy::new(1, Duration::ZERO)
}

pub fn build_input(kind: InputKind, options: &ChannelOptions) -> Result<Box<dyn Channel>> {
    Ok(match kind {
        InputKind::Human => Box::new(ResilientChannel::new(
            TerminalTransport::input(Labels::client_side()),
            local_policy(),
        )),
        InputKind::Pipe => {
            if options.cmd.is_empty() {
                bail!("--cmd is required when --input=pipe");
            }
            Box::new(ResilientChannel::new(
                PipeTransport::new(options.cmd.clone()),
                options.retry.clone(),
            ))
        }
        InputKind::Websocket => Box::new(ResilientChannel::new(
            WebSocketTransport::new(options.input_ws_uri.clone()),
            options.retry.clone(),
        )),
    })
}

pub fn build_output(kind: OutputKind, options: &ChannelOptions) -> Box<dyn Channel> {
    match kind {
        OutputKind::Human => Box::new(ResilientChannel::new(
            TerminalTransport::output(Labels::client_side()),
            local_policy(),
        )),
        OutputKind::Stdout => Box::new(ResilientChannel::new(StdoutTransport::new(), local_policy())),
        OutputKind::Websocket => Box::new(ResilientChannel::new(
            WebSocketTransport::new(options.output_ws_uri.clone()),
            options.retry.clone(),
        )),
    }
}
