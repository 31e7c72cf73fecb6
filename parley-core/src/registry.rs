// ABOUTME: Server-side set of live connections with best-effort concurrent fan-out.
// ABOUTME: Recipients that exhaust their retry budget are evicted without failing the broadcast.

use crate::channel::EnvelopeSink;
use crate::envelope::Envelope;
use crate::error::{EndOfStream, TransportError};
use crate::retry::{RetryPolicy, RetryState};
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Identity of one accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outbound half of a live connection
#[async_trait]
pub trait Connection: Send + Sync {
    fn id(&self) -> ConnectionId;

    async fn send(&self, frame: &str) -> Result<(), TransportError>;
}

/// Per-recipient delivery budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastPolicy {
    pub retry: RetryPolicy,
    /// A send slower than this counts as a failed attempt
    pub send_timeout: Duration,
}

impl Default for BroadcastPolicy {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::new(3, Duration::from_millis(500)),
            send_timeout: Duration::from_secs(5),
        }
    }
}

/// Outcome of one broadcast, for logging only
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub evicted: Vec<ConnectionId>,
}

pub struct ConnectionRegistry {
    members: Mutex<HashMap<ConnectionId, Arc<dyn Connection>>>,
    policy: BroadcastPolicy,
}

impl ConnectionRegistry {
    pub fn new(policy: BroadcastPolicy) -> Self {
        Self {
            members: Mutex::new(HashMap::new()),
            policy,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ConnectionId, Arc<dyn Connection>>> {
        self.members.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a connection; returns false when it was already registered
    pub fn register(&self, connection: Arc<dyn Connection>) -> bool {
        let id = connection.id();
        let count = {
            let mut members = self.lock();
            if members.contains_key(&id) {
                return false;
            }
            members.insert(id, connection);
            members.len()
        };
        crate::metrics::set_active_connections(count);
        tracing::debug!(connection_id = %id, connections = count, "Connection registered");
        true
    }

    /// Remove a connection; returns false when it was not registered
    pub fn unregister(&self, id: &ConnectionId) -> bool {
        let (removed, count) = {
            let mut members = self.lock();
            let removed = members.remove(id).is_some();
            (removed, members.len())
        };
        if removed {
            crate::metrics::set_active_connections(count);
            tracing::debug!(connection_id = %id, connections = count, "Connection unregistered");
        }
        removed
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Serialize once and deliver to every registered connection
    pub async fn broadcast(&self, envelope: &Envelope) -> BroadcastReport {
        let frame = match envelope.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(request_id = %envelope.request_id, error = %e, "Failed to encode broadcast envelope");
                return BroadcastReport::default();
            }
        };
        let report = self.broadcast_raw(&frame).await;
        if report.delivered > 0 {
            crate::metrics::record_envelope_out(envelope.kind);
        }
        report
    }

    /// Deliver a pre-encoded frame to every registered connection concurrently
    pub async fn broadcast_raw(&self, frame: &str) -> BroadcastReport {
        // Snapshot so the lock is never held across a send
        let recipients: Vec<Arc<dyn Connection>> = self.lock().values().cloned().collect();

        let outcomes = join_all(
            recipients
                .iter()
                .map(|connection| deliver(connection.as_ref(), frame, &self.policy)),
        )
        .await;

        let mut report = BroadcastReport::default();
        for (connection, delivered) in recipients.iter().zip(outcomes) {
            if delivered {
                report.delivered += 1;
            } else {
                let id = connection.id();
                if self.unregister(&id) {
                    crate::metrics::record_eviction();
                    tracing::warn!(connection_id = %id, "Evicted unreachable connection");
                }
                report.evicted.push(id);
            }
        }
        report
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(BroadcastPolicy::default())
    }
}

/// Send with a bounded retry budget; false once the budget is spent
async fn deliver(connection: &dyn Connection, frame: &str, policy: &BroadcastPolicy) -> bool {
    let mut retry = RetryState::new(policy.retry.clone());

    loop {
        let error = match tokio::time::timeout(policy.send_timeout, connection.send(frame)).await {
            Ok(Ok(())) => return true,
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("send timed out after {:?}", policy.send_timeout),
        };

        match retry.record_failure() {
            Some(delay) => {
                tracing::debug!(
                    connection_id = %connection.id(),
                    attempt = retry.failures(),
                    error = %error,
                    "Broadcast send failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            None => {
                tracing::warn!(
                    connection_id = %connection.id(),
                    attempts = retry.failures(),
                    error = %error,
                    "Broadcast send failed permanently"
                );
                return false;
            }
        }
    }
}

/// Adapts a shared registry to [`EnvelopeSink`]; writes never fail
#[derive(Clone)]
pub struct RegistrySink {
    registry: Arc<ConnectionRegistry>,
}

impl RegistrySink {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl EnvelopeSink for RegistrySink {
    async fn write(&mut self, envelope: &Envelope) -> Result<(), EndOfStream> {
        let report = self.registry.broadcast(envelope).await;
        if !report.evicted.is_empty() {
            tracing::info!(
                delivered = report.delivered,
                evicted = report.evicted.len(),
                "Broadcast completed with evictions"
            );
        }
        Ok(())
    }
}
