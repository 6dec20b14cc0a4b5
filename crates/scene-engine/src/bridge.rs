//! Request/response bridge to the external rendering engine
//!
//! Nodes issue string operations (`create`, `bootstrap`, ...) through a
//! [`HostBridge`]; the engine side answers each [`BridgeRequest`] exactly
//! once. A call suspends only the calling node's update and is bounded by the
//! bridge timeout.
//!
//! Each node may have at most one call in flight. A second call from the same
//! node fails with `BridgeBusy` instead of queueing. Tree teardown cancels
//! outstanding calls, which then fail with `BridgeCancelled`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, Notify};

use crate::error::{Result, SceneError};
use crate::types::NodeId;

/// Operation names understood by the external engine
pub mod ops {
    /// Create an entity from a descriptor; answers with an entity handle
    pub const CREATE: &str = "create";
    /// Liveness check; answers once the engine is ready
    pub const BOOTSTRAP: &str = "bootstrap";
}

/// Default time to wait for an answer
pub const DEFAULT_BRIDGE_TIMEOUT: Duration = Duration::from_secs(2);

/// One call waiting for the external engine
#[derive(Debug)]
pub struct BridgeRequest {
    pub caller: NodeId,
    pub operation: String,
    pub payload: String,
    reply: oneshot::Sender<String>,
}

impl BridgeRequest {
    /// Answer the call.
    ///
    /// Returns false if the caller stopped waiting (timeout or cancellation).
    pub fn respond(self, reply: impl Into<String>) -> bool {
        self.reply.send(reply.into()).is_ok()
    }
}

/// How requests reach the external engine
#[async_trait]
pub trait HostTransport: Send + Sync {
    /// Hand a request to the engine. The engine answers through the request.
    async fn deliver(&self, request: BridgeRequest) -> Result<()>;
}

/// In-process transport backed by a bounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    sender: mpsc::Sender<BridgeRequest>,
}

impl ChannelTransport {
    /// Create a transport and the endpoint the engine reads from
    pub fn pair(capacity: usize) -> (Self, HostEndpoint) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, HostEndpoint { receiver })
    }
}

#[async_trait]
impl HostTransport for ChannelTransport {
    async fn deliver(&self, request: BridgeRequest) -> Result<()> {
        self.sender
            .send(request)
            .await
            .map_err(|_| SceneError::BridgeUnavailable("engine endpoint closed".to_string()))
    }
}

/// Engine side of a [`ChannelTransport`]
#[derive(Debug)]
pub struct HostEndpoint {
    receiver: mpsc::Receiver<BridgeRequest>,
}

impl HostEndpoint {
    /// Wait for the next request; `None` once every transport is dropped
    pub async fn recv(&mut self) -> Option<BridgeRequest> {
        self.receiver.recv().await
    }
}

/// Bridge shared by every node of a tree
pub struct HostBridge {
    transport: Arc<dyn HostTransport>,
    timeout: Duration,
    in_flight: Mutex<HashMap<NodeId, Arc<Notify>>>,
}

/// Clears the caller's in-flight slot however the call ends
struct InFlight<'a> {
    bridge: &'a HostBridge,
    caller: NodeId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.bridge.in_flight.lock().remove(&self.caller);
    }
}

impl HostBridge {
    pub fn new(transport: Arc<dyn HostTransport>, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Create a bridge over a fresh in-process channel
    pub fn channel(capacity: usize, timeout: Duration) -> (Self, HostEndpoint) {
        let (transport, endpoint) = ChannelTransport::pair(capacity);
        (Self::new(Arc::new(transport), timeout), endpoint)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send an operation on behalf of `caller` and wait for the answer
    pub async fn send(&self, caller: NodeId, operation: &str, payload: &str) -> Result<String> {
        let cancelled = {
            let mut in_flight = self.in_flight.lock();
            if in_flight.contains_key(&caller) {
                return Err(SceneError::BridgeBusy(caller));
            }
            let notify = Arc::new(Notify::new());
            in_flight.insert(caller, notify.clone());
            notify
        };
        let _slot = InFlight {
            bridge: self,
            caller,
        };

        let (reply, answer) = oneshot::channel();
        let request = BridgeRequest {
            caller,
            operation: operation.to_string(),
            payload: payload.to_string(),
            reply,
        };
        log::trace!("Bridge call from {}: {}({})", caller, operation, payload);

        let exchange = async {
            self.transport.deliver(request).await?;
            answer.await.map_err(|_| {
                SceneError::BridgeUnavailable(format!("engine dropped '{}' without answering", operation))
            })
        };

        tokio::select! {
            _ = cancelled.notified() => Err(SceneError::BridgeCancelled(caller)),
            outcome = tokio::time::timeout(self.timeout, exchange) => match outcome {
                Ok(result) => result,
                Err(_) => {
                    log::warn!("Bridge call '{}' from {} timed out after {:?}", operation, caller, self.timeout);
                    Err(SceneError::BridgeTimeout {
                        operation: operation.to_string(),
                        after: self.timeout,
                    })
                }
            },
        }
    }

    /// Whether `caller` has a call in flight
    pub fn is_busy(&self, caller: NodeId) -> bool {
        self.in_flight.lock().contains_key(&caller)
    }

    /// Cancel the call in flight for `caller`, if any
    pub fn cancel(&self, caller: NodeId) -> bool {
        match self.in_flight.lock().get(&caller) {
            Some(notify) => {
                notify.notify_one();
                true
            }
            None => false,
        }
    }

    /// Cancel every call in flight; returns how many were signalled
    pub fn cancel_all(&self) -> usize {
        let in_flight = self.in_flight.lock();
        for notify in in_flight.values() {
            notify.notify_one();
        }
        in_flight.len()
    }

    /// Ping the engine with `bootstrap` until it answers.
    ///
    /// Tries `attempts` times, sleeping `backoff` between failures.
    pub async fn wait_ready(&self, attempts: u32, backoff: Duration) -> Result<String> {
        let attempts = attempts.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            match self.send(NodeId::HOST, ops::BOOTSTRAP, "").await {
                Ok(reply) => {
                    log::info!("Engine ready after {} attempt(s): {}", attempt, reply);
                    return Ok(reply);
                }
                Err(e) => {
                    log::warn!("Engine not ready (attempt {}/{}): {}", attempt, attempts, e);
                    last_error = Some(e);
                }
            }
            if attempt < attempts {
                tokio::time::sleep(backoff).await;
            }
        }
        Err(SceneError::BridgeUnavailable(format!(
            "engine not ready after {} attempts: {}",
            attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}

impl std::fmt::Debug for HostBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBridge")
            .field("timeout", &self.timeout)
            .field("in_flight", &self.in_flight.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODE: NodeId = NodeId::HOST;

    /// Answer every request with "<operation>:<payload>"
    fn spawn_echo(mut endpoint: HostEndpoint) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(request) = endpoint.recv().await {
                let reply = format!("{}:{}", request.operation, request.payload);
                request.respond(reply);
            }
        })
    }

    #[tokio::test]
    async fn test_send_returns_reply() {
        let (bridge, endpoint) = HostBridge::channel(8, Duration::from_secs(1));
        spawn_echo(endpoint);

        let reply = bridge.send(NODE, ops::CREATE, "light").await.unwrap();
        assert_eq!(reply, "create:light");
        assert!(!bridge.is_busy(NODE));
    }

    #[tokio::test]
    async fn test_send_times_out() {
        let (bridge, mut endpoint) = HostBridge::channel(8, Duration::from_millis(20));
        // Hold the first request without answering, echo the rest.
        let holder = tokio::spawn(async move {
            let held = endpoint.recv().await;
            while let Some(request) = endpoint.recv().await {
                let reply = format!("{}:{}", request.operation, request.payload);
                request.respond(reply);
            }
            drop(held);
        });

        let err = bridge.send(NODE, ops::CREATE, "cube").await.unwrap_err();
        assert!(matches!(err, SceneError::BridgeTimeout { ref operation, .. } if operation == "create"));
        assert!(!bridge.is_busy(NODE));

        let reply = bridge.send(NODE, ops::CREATE, "sphere").await.unwrap();
        assert_eq!(reply, "create:sphere");
        drop(bridge);
        holder.await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_endpoint_is_unavailable() {
        let (bridge, endpoint) = HostBridge::channel(8, Duration::from_secs(1));
        drop(endpoint);

        let err = bridge.send(NODE, ops::CREATE, "cube").await.unwrap_err();
        assert!(matches!(err, SceneError::BridgeUnavailable(_)));
        assert!(!bridge.is_busy(NODE));

        // The slot is free again, so a retry reaches the transport instead of reporting busy.
        let err = bridge.send(NODE, ops::CREATE, "cube").await.unwrap_err();
        assert!(matches!(err, SceneError::BridgeUnavailable(_)));
    }

    #[tokio::test]
    async fn test_second_call_from_same_node_is_busy() {
        let (bridge, mut endpoint) = HostBridge::channel(8, Duration::from_secs(1));
        let bridge = Arc::new(bridge);

        let first = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.send(NODE, ops::CREATE, "first").await })
        };
        let request = endpoint.recv().await.unwrap();
        assert!(bridge.is_busy(NODE));

        let err = bridge.send(NODE, ops::CREATE, "second").await.unwrap_err();
        assert!(matches!(err, SceneError::BridgeBusy(id) if id == NODE));

        assert!(request.respond("entity:first"));
        assert_eq!(first.await.unwrap().unwrap(), "entity:first");
        assert!(!bridge.is_busy(NODE));
    }

    #[tokio::test]
    async fn test_cancel_fails_pending_call() {
        let (bridge, mut endpoint) = HostBridge::channel(8, Duration::from_secs(5));
        let bridge = Arc::new(bridge);

        let pending = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.send(NODE, ops::CREATE, "cube").await })
        };
        let request = endpoint.recv().await.unwrap();

        assert_eq!(bridge.cancel_all(), 1);
        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, SceneError::BridgeCancelled(id) if id == NODE));
        // The late answer goes nowhere.
        assert!(!request.respond("entity:cube"));
        assert!(!bridge.cancel(NODE));
        assert!(!bridge.is_busy(NODE));

        spawn_echo(endpoint);
        let reply = bridge.send(NODE, ops::CREATE, "cube").await.unwrap();
        assert_eq!(reply, "create:cube");
    }

    #[tokio::test]
    async fn test_wait_ready_retries_until_answered() {
        let (bridge, mut endpoint) = HostBridge::channel(8, Duration::from_millis(20));
        tokio::spawn(async move {
            // Ignore the first ping, answer the second.
            let ignored = endpoint.recv().await;
            drop(ignored);
            while let Some(request) = endpoint.recv().await {
                request.respond("ready");
            }
        });

        let reply = bridge.wait_ready(3, Duration::from_millis(1)).await.unwrap();
        assert_eq!(reply, "ready");
    }

    #[tokio::test]
    async fn test_wait_ready_gives_up() {
        let (bridge, endpoint) = HostBridge::channel(8, Duration::from_millis(10));
        drop(endpoint);

        let err = bridge.wait_ready(2, Duration::from_millis(1)).await.unwrap_err();
        assert!(matches!(err, SceneError::BridgeUnavailable(msg) if msg.contains("2 attempts")));
    }
}
