//! Error types for the scene engine

use std::time::Duration;

use thiserror::Error;

use crate::types::NodeId;

/// Result type alias using SceneError
pub type Result<T> = std::result::Result<T, SceneError>;

/// Errors that can occur while building, wiring, or running a scene tree
#[derive(Debug, Error)]
pub enum SceneError {
    /// No factory registered for a kind tag
    #[error("Unknown kind: {0}")]
    UnknownKind(String),

    /// A kind tag was registered twice
    #[error("Kind already registered: {0}")]
    DuplicateKind(String),

    /// A singleton kind was declared differently from its live instance
    #[error("Singleton '{kind}' declared with conflicting props, children or routes")]
    SingletonConflict { kind: String },

    /// A route endpoint does not name an existing node
    #[error("Route '{route}': endpoint '{path}' does not resolve to a node")]
    UnresolvedEndpoint { route: String, path: String },

    /// A route whose sink is its own source
    #[error("Route '{0}' loops back to its own source")]
    CyclicRoute(String),

    /// The same source/sink pair was wired twice
    #[error("Route '{0}' is already registered")]
    DuplicateRoute(String),

    /// A route string that is not of the form "source -> sink"
    #[error("Malformed route '{0}': expected \"source -> sink\"")]
    InvalidRoute(String),

    /// The external engine cannot be reached
    #[error("Host bridge unavailable: {0}")]
    BridgeUnavailable(String),

    /// The external engine did not answer in time
    #[error("Host bridge timed out after {after:?} waiting for '{operation}'")]
    BridgeTimeout { operation: String, after: Duration },

    /// The caller already has a bridge call in flight
    #[error("Node {0} already has a host bridge call in flight")]
    BridgeBusy(NodeId),

    /// The call was cancelled by tree teardown
    #[error("Host bridge call from node {0} was cancelled")]
    BridgeCancelled(NodeId),

    /// The system document could not be turned into node specs
    #[error("Invalid system document: {0}")]
    InvalidDocument(String),

    /// A behavior reported a failure of its own
    #[error("Behavior failed: {0}")]
    Behavior(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SceneError {
    /// Create a behavior failure with a message
    pub fn behavior(msg: impl Into<String>) -> Self {
        Self::Behavior(msg.into())
    }

    /// Create an invalid document error with a message
    pub fn document(msg: impl Into<String>) -> Self {
        Self::InvalidDocument(msg.into())
    }

    /// Whether this error came from the host bridge.
    ///
    /// Bridge errors are local to the calling node's tick.
    pub fn is_bridge_error(&self) -> bool {
        matches!(
            self,
            Self::BridgeUnavailable(_)
                | Self::BridgeTimeout { .. }
                | Self::BridgeBusy(_)
                | Self::BridgeCancelled(_)
        )
    }

    /// Whether this error aborts a build or wiring pass
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownKind(_)
                | Self::DuplicateKind(_)
                | Self::SingletonConflict { .. }
                | Self::UnresolvedEndpoint { .. }
                | Self::CyclicRoute(_)
                | Self::DuplicateRoute(_)
                | Self::InvalidRoute(_)
        )
    }
}
