//! Event types for observing a running scene
//!
//! Events are sent from the builder and scheduler to any consumer (the host
//! binary logs them; tests collect them) to report tree lifecycle, wiring,
//! and per-tick progress.

use serde::{Deserialize, Serialize};

/// Trait for sending scene events
///
/// This abstracts over the transport so the engine does not care whether
/// events end up in a log, a channel, or a test vector.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be delivered (e.g., channel closed)
    fn send(&self, event: SceneEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

/// Events emitted while building and running a tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SceneEvent {
    /// A tree finished building and wiring
    #[serde(rename_all = "camelCase")]
    TreeBuilt {
        tree_id: String,
        nodes: usize,
        routes: usize,
    },

    /// A wire was registered with the broker
    #[serde(rename_all = "camelCase")]
    RouteRegistered {
        tree_id: String,
        route: String,
    },

    /// One tick finished
    #[serde(rename_all = "camelCase")]
    TickCompleted {
        tree_id: String,
        tick: u64,
        updated: usize,
        failed: usize,
    },

    /// A node's update failed; the rest of the tick continued
    #[serde(rename_all = "camelCase")]
    NodeFailed {
        tree_id: String,
        tick: u64,
        node: String,
        kind: String,
        error: String,
    },

    /// A tree was torn down
    #[serde(rename_all = "camelCase")]
    TreeTornDown {
        tree_id: String,
        ticks: u64,
    },
}

impl SceneEvent {
    /// Create a node failure event
    pub fn node_failed(tree_id: &str, tick: u64, node: &str, kind: &str, error: &str) -> Self {
        Self::NodeFailed {
            tree_id: tree_id.to_string(),
            tick,
            node: node.to_string(),
            kind: kind.to_string(),
            error: error.to_string(),
        }
    }
}

/// Send an event, logging instead of failing if the sink rejects it
pub(crate) fn emit(sink: &dyn EventSink, event: SceneEvent) {
    if let Err(e) = sink.send(event) {
        log::warn!("Dropped scene event: {}", e);
    }
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: SceneEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// An event sink that writes every event to the `log` facade at debug level
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn send(&self, event: SceneEvent) -> Result<(), EventError> {
        match &event {
            SceneEvent::NodeFailed { .. } => log::warn!("{:?}", event),
            _ => log::debug!("{:?}", event),
        }
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: parking_lot::Mutex<Vec<SceneEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<SceneEvent> {
        self.events.lock().clone()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: SceneEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}
