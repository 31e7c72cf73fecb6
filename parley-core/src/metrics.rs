// ABOUTME: Prometheus metrics for envelope traffic, failures, and live connections.
// ABOUTME: Recording is a no-op until a recorder is installed with init_metrics.

use crate::envelope::MessageType;
use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder and return a handle for rendering
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(handle)
}

pub fn record_envelope_in(kind: MessageType) {
    counter!("parley_envelopes_in_total", "type" => kind.as_str()).increment(1);
}

pub fn record_envelope_out(kind: MessageType) {
    counter!("parley_envelopes_out_total", "type" => kind.as_str()).increment(1);
}

pub fn record_validation_error() {
    counter!("parley_validation_errors_total").increment(1);
}

pub fn record_responder_failure(responder: &'static str) {
    counter!("parley_responder_failures_total", "responder" => responder).increment(1);
}

pub fn record_eviction() {
    counter!("parley_broadcast_evictions_total").increment(1);
}

pub fn record_reconnect() {
    counter!("parley_reconnects_total").increment(1);
}

pub fn set_active_connections(count: usize) {
    gauge!("parley_active_connections").set(count as f64);
}
