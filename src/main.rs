// ABOUTME: Command-line entry point: runs either the websocket server or a client relay.
// ABOUTME: Loads .env and parley.toml, applies CLI overrides, then hands off to server or client.

use anyhow::{Context, Result};
use clap::Parser;
use parley::client;
use parley::config::Config;
use parley::server::{self, ServerState};
use parley::transport::{build_input, build_output, ChannelOptions, InputKind, OutputKind};
use parley::ui::{Labels, TerminalRenderer};
use parley_agent::{Conversation, ResponderRegistry};
use parley_core::ConnectionRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug, Parser)]
#[command(name = "parley", version, about = "Turn-based chat relay between questioners and responders")]
struct Cli {
    /// Responder used by the server
    #[arg(long)]
    mode: Option<String>,

    /// Canned answer for --mode fixed
    #[arg(long)]
    reply: Option<String>,

    /// Stream answers as partial messages
    #[arg(long)]
    stream: bool,

    #[arg(long, value_enum, default_value_t = InputKind::Human)]
    input: InputKind,

    #[arg(long, value_enum, default_value_t = OutputKind::Websocket)]
    output: OutputKind,

    /// Command whose stdout supplies questions for --input pipe
    #[arg(long, num_args = 1.., allow_hyphen_values = true)]
    cmd: Vec<String>,

    #[arg(long, default_value = "ws://localhost:8000/ws")]
    input_ws_uri: String,

    #[arg(long, default_value = "ws://localhost:8000/ws")]
    output_ws_uri: String,

    /// Run the websocket server instead of a client
    #[arg(long)]
    server: bool,

    /// Server listen address (host:port)
    #[arg(long)]
    bind: Option<String>,

    /// Explicit config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write logs to this file; the console then only shows warnings
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Emit console logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(mode) = &self.mode {
            config.responder.responder_type = mode.clone();
        }
        if let Some(reply) = &self.reply {
            config.responder.options.insert("reply".to_string(), reply.clone().into());
        }
        if self.stream {
            config.stream.enabled = true;
        }
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _guard = parley::logging::init(cli.log_file.as_deref(), cli.log_json)?;

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    tracing::info!(
        server = cli.server,
        responder = config.responder.responder_type(),
        stream = config.stream.enabled,
        batch_size = config.stream.batch_size,
        "Configuration loaded"
    );

    if cli.server {
        run_server(config).await
    } else {
        run_client(&cli, &config).await
    }
}

async fn run_server(config: Config) -> Result<()> {
    let responder = ResponderRegistry::default().create_from_config(&config.responder)?;

    let metrics = if config.metrics.enabled {
        Some(parley_core::metrics::init_metrics()?)
    } else {
        None
    };

    let state = Arc::new(ServerState {
        registry: Arc::new(ConnectionRegistry::new(config.registry.broadcast_policy())),
        renderer: Arc::new(TerminalRenderer::new(Labels::server_side(responder.name()))),
        responder,
        conversation: Conversation::shared(),
        orchestrator: config.orchestrator_config(),
        channel_retry: config.channel.retry_policy(),
    });

    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;

    server::serve(listener, state, metrics, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
    })
    .await
}

async fn run_client(cli: &Cli, config: &Config) -> Result<()> {
    let options = ChannelOptions {
        cmd: cli.cmd.clone(),
        input_ws_uri: cli.input_ws_uri.clone(),
        output_ws_uri: cli.output_ws_uri.clone(),
        retry: config.channel.retry_policy(),
    };
    let mut input = build_input(cli.input, &options)?;
    let mut output = build_output(cli.output, &options);
    let renderer = TerminalRenderer::new(Labels::client_side());

    client::run(&mut input, &mut output, &renderer).await;
    Ok(())
}
