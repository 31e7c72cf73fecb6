// ABOUTME: Axum server: websocket clients ask questions, every client sees every answer.
// ABOUTME: Each accepted socket runs its own orchestrator loop sharing one registry and conversation.

use crate::transport::{AcceptedConnection, AcceptedTransport};
use anyhow::{Context, Result};
use axum::{
    extract::{ws::WebSocket, State, WebSocketUpgrade},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures_util::StreamExt;
use metrics_exporter_prometheus::PrometheusHandle;
use parley_core::{
    Channel, ConnectionRegistry, Orchestrator, OrchestratorConfig, RegistrySink, Renderer,
    ResilientChannel, RetryPolicy, SharedConversation,
};
use parley_agent::Responder;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared by every connection task
pub struct ServerState {
    pub registry: Arc<ConnectionRegistry>,
    pub responder: Arc<dyn Responder>,
    pub conversation: SharedConversation,
    pub renderer: Arc<dyn Renderer>,
    pub orchestrator: OrchestratorConfig,
    /// Budget for replies written back to a single client
    pub channel_retry: RetryPolicy,
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("connections", &self.registry.len())
            .field("responder", &self.responder.name())
            .field("orchestrator", &self.orchestrator)
            .finish()
    }
}

pub fn router(state: Arc<ServerState>, metrics: Option<PrometheusHandle>) -> Router {
    let mut app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .with_state(state);

    if let Some(handle) = metrics {
        let metrics_routes = Router::new()
            .route("/metrics", get(metrics_handler))
            .with_state(Arc::new(handle));
        app = app.merge(metrics_routes);
    }

    app.layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<ServerState>,
    metrics: Option<PrometheusHandle>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("Listener has no local address")?;
    tracing::info!(addr = %addr, responder = state.responder.name(), "Starting websocket server");

    axum::serve(listener, router(state, metrics))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server failed")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn ws_handler(State(state): State<Arc<ServerState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn metrics_handler(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}

async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    let (sink, stream) = socket.split();
    let connection = Arc::new(AcceptedConnection::new(sink));
    let id = parley_core::Connection::id(connection.as_ref());
    state.registry.register(connection.clone());
    tracing::info!(connection_id = %id, connections = state.registry.len(), "Client connected");

    let mut channel = ResilientChannel::new(
        AcceptedTransport::new(stream, connection),
        state.channel_retry.clone(),
    );
    let mut outbound = RegistrySink::new(state.registry.clone());
    let mut orchestrator = Orchestrator::new(
        state.responder.clone(),
        state.conversation.clone(),
        state.renderer.clone(),
        state.orchestrator.clone(),
    );

    let end = match channel.start().await {
        Ok(()) => orchestrator.run(&mut channel, &mut outbound).await,
        Err(end) => parley_core::SessionEnd::InboundClosed(end),
    };

    channel.stop().await;
    state.registry.unregister(&id);
    tracing::info!(connection_id = %id, end = ?end, "Client disconnected");
}
