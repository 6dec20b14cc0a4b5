//! Scene Engine - Declarative node-tree runtime for Orbital
//!
//! This crate turns a declarative tree of node descriptions into a live,
//! running graph. It provides:
//!
//! - Kind-tag dispatch through a registry of behavior factories
//! - Shared, reference-counted singleton instances
//! - Effects that act on their host node through a weak back-reference
//! - A broker delivering messages along `"source -> sink"` wires
//! - A cooperative tick scheduler
//! - A bounded request/response bridge to an external rendering engine
//!
//! # Architecture
//!
//! - `KindRegistry`: kind tag to factory, resolved once per node at build time
//! - `SingletonRegistry`: at most one live instance per singleton kind
//! - `TreeBuilder`: construction and wiring passes producing a `SceneTree`
//! - `Broker`: bounded per-sink channels keyed by node identity
//! - `Scheduler`: pre-order ticks, effects right after their host
//! - `HostBridge`: one in-flight call per node, with timeout and cancellation
//!
//! # Example
//!
//! ```ignore
//! use scene_engine::{parse_document, KindRegistry, Scheduler, TreeBuilder};
//!
//! let registry = Arc::new(KindRegistry::with_builtins()?);
//! let mut tree = TreeBuilder::new(registry).build(&parse_document(text)?)?;
//! Scheduler::default().run(&mut tree, Some(60)).await;
//! tree.teardown();
//! ```

pub mod behavior;
pub mod bridge;
pub mod broker;
pub mod builder;
pub mod descriptor;
pub mod document;
pub mod error;
pub mod events;
pub mod node;
pub mod registry;
pub mod scheduler;
pub mod singleton;
pub mod tree;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export key types
pub use behavior::{Behavior, TickContext, TopicRequest};
pub use bridge::{ops, BridgeRequest, ChannelTransport, HostBridge, HostEndpoint, HostTransport};
pub use broker::{Broker, BrokerConfig, OverflowPolicy, Route};
pub use builder::TreeBuilder;
pub use descriptor::{KindCategory, KindDescriptor, KindMetadata, KindRegistration};
pub use document::{load_document, parse_document};
pub use error::{Result, SceneError};
pub use events::{EventSink, LogEventSink, NullEventSink, SceneEvent, VecEventSink};
pub use node::{Attached, Node};
pub use registry::{KindFactory, KindRegistry};
pub use scheduler::{Scheduler, TickReport, TraversalPlan};
pub use singleton::SingletonRegistry;
pub use tree::SceneTree;
pub use types::{NodeId, NodeRole, NodeSpec, Props};
