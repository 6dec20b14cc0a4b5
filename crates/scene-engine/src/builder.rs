//! Tree builder: turns a [`NodeSpec`] tree into a live, wired [`SceneTree`]
//!
//! # Example
//!
//! ```ignore
//! let registry = Arc::new(KindRegistry::with_builtins()?);
//! let tree = TreeBuilder::new(registry)
//!     .with_bridge(bridge)
//!     .build(&document)?;
//! ```
//!
//! Building happens in two passes. The construction pass walks the spec tree
//! depth-first, parent before children, so a factory always sees its parent
//! node. The wiring pass then registers every declared route against the
//! scope that declared it. A failure in either pass discards everything built
//! so far, including the singleton references the pass took.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use crate::bridge::HostBridge;
use crate::broker::{Broker, BrokerConfig};
use crate::error::Result;
use crate::events::{emit, EventSink, NullEventSink, SceneEvent};
use crate::node::{Attached, Node};
use crate::registry::KindRegistry;
use crate::singleton::SingletonRegistry;
use crate::tree::SceneTree;
use crate::types::{NodeId, NodeRole, NodeSpec};

/// Builds scene trees from specs
pub struct TreeBuilder {
    registry: Arc<KindRegistry>,
    singletons: Arc<SingletonRegistry>,
    broker_config: BrokerConfig,
    events: Arc<dyn EventSink>,
    bridge: Option<Arc<HostBridge>>,
}

impl TreeBuilder {
    /// Create a builder with its own singleton registry
    pub fn new(registry: Arc<KindRegistry>) -> Self {
        let singletons = Arc::new(SingletonRegistry::from_registry(&registry));
        Self {
            registry,
            singletons,
            broker_config: BrokerConfig::default(),
            events: Arc::new(NullEventSink),
            bridge: None,
        }
    }

    /// Share a singleton registry with other builders
    pub fn with_singletons(mut self, singletons: Arc<SingletonRegistry>) -> Self {
        self.singletons = singletons;
        self
    }

    pub fn with_broker_config(mut self, config: BrokerConfig) -> Self {
        self.broker_config = config;
        self
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Attach the host bridge handed to every node's updates
    pub fn with_bridge(mut self, bridge: Arc<HostBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn registry(&self) -> &Arc<KindRegistry> {
        &self.registry
    }

    pub fn singletons(&self) -> &Arc<SingletonRegistry> {
        &self.singletons
    }

    /// Build and wire a tree rooted at `spec`
    pub fn build(&self, spec: &NodeSpec) -> Result<SceneTree> {
        let mut pass = BuildPass {
            builder: self,
            leases: Vec::new(),
        };
        match pass.run(spec) {
            Ok((root, broker)) => {
                let tree = SceneTree::new(
                    root,
                    broker,
                    self.bridge.clone(),
                    self.singletons.clone(),
                    std::mem::take(&mut pass.leases),
                    self.events.clone(),
                );
                let tree_id = tree.id().to_string();
                for route in tree.broker().routes() {
                    emit(
                        self.events.as_ref(),
                        SceneEvent::RouteRegistered {
                            tree_id: tree_id.clone(),
                            route: route.to_string(),
                        },
                    );
                }
                let nodes = tree.node_ids().len();
                log::info!(
                    "Scene tree {} built: {} nodes, {} routes",
                    tree.id(),
                    nodes,
                    tree.broker().routes().len()
                );
                emit(
                    self.events.as_ref(),
                    SceneEvent::TreeBuilt {
                        tree_id,
                        nodes,
                        routes: tree.broker().routes().len(),
                    },
                );
                Ok(tree)
            }
            Err(e) => {
                log::warn!("Build of '{}' aborted: {}", spec.name, e);
                for kind in pass.leases.drain(..).rev() {
                    self.singletons.release(&kind);
                }
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for TreeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeBuilder")
            .field("kinds", &self.registry.kinds())
            .field("singletons", &self.singletons)
            .field("broker_config", &self.broker_config)
            .field("bridge", &self.bridge.is_some())
            .finish()
    }
}

/// State of one build; its leases are returned if the build fails
struct BuildPass<'a> {
    builder: &'a TreeBuilder,
    leases: Vec<String>,
}

impl BuildPass<'_> {
    fn run(&mut self, spec: &NodeSpec) -> Result<(Arc<Node>, Broker)> {
        let root = if self.builder.singletons.is_singleton(&spec.kind) {
            self.shared(spec)?
        } else {
            self.construct(spec, None, NodeRole::Standalone)?
        };

        let mut broker = Broker::new(self.builder.broker_config);
        let mut wired = HashSet::new();
        self.wire(spec, &root, &mut broker, &mut wired)?;
        Ok((root, broker))
    }

    /// Resolve a singleton declaration, taking one lease
    fn shared(&mut self, spec: &NodeSpec) -> Result<Arc<Node>> {
        let builder = self.builder;
        let node = builder
            .singletons
            .get_or_create(spec, |spec| self.construct(spec, None, NodeRole::Singleton))?;
        self.leases.push(spec.kind.clone());
        Ok(node)
    }

    fn construct(
        &mut self,
        spec: &NodeSpec,
        parent: Option<&Arc<Node>>,
        role: NodeRole,
    ) -> Result<Arc<Node>> {
        let factory = self.builder.registry.resolve(&spec.kind)?;
        let behavior = factory.create(spec, parent.map(|p| &**p))?;
        let back = parent.map(Arc::downgrade).unwrap_or_else(Weak::new);
        let node = Arc::new(Node::new(spec, role, back, behavior));
        log::trace!("Constructed {} '{}' ({})", node.id(), spec.name, spec.kind);

        let mut children = Vec::new();
        let mut effects = Vec::new();
        for child in &spec.children {
            match self.placement(child) {
                Placement::Shared => children.push(Attached::new(&child.name, self.shared(child)?)),
                Placement::Effect => effects.push(Attached::new(
                    &child.name,
                    self.construct(child, Some(&node), NodeRole::Effect)?,
                )),
                Placement::Child => children.push(Attached::new(
                    &child.name,
                    self.construct(child, Some(&node), NodeRole::Standalone)?,
                )),
            }
        }
        node.attach(children, effects);
        Ok(node)
    }

    fn placement(&self, spec: &NodeSpec) -> Placement {
        if self.builder.singletons.is_singleton(&spec.kind) {
            Placement::Shared
        } else if spec.is_effect() {
            Placement::Effect
        } else {
            Placement::Child
        }
    }

    /// Register `spec`'s routes in `node`'s scope, then recurse.
    ///
    /// Every declaration of a singleton is identical, so a shared node is
    /// wired once.
    fn wire(
        &self,
        spec: &NodeSpec,
        node: &Arc<Node>,
        broker: &mut Broker,
        wired: &mut HashSet<NodeId>,
    ) -> Result<()> {
        if !wired.insert(node.id()) {
            return Ok(());
        }
        for route in &spec.routes {
            let route = broker.register_route(route, node)?;
            log::debug!("Wired {} in '{}'", route, spec.name);
        }

        let mut children = node.children().iter();
        let mut effects = node.effects().iter();
        for child in &spec.children {
            let attached = match self.placement(child) {
                Placement::Effect => effects.next(),
                Placement::Shared | Placement::Child => children.next(),
            };
            if let Some(attached) = attached {
                self.wire(child, attached.node(), broker, wired)?;
            }
        }
        Ok(())
    }
}

enum Placement {
    Shared,
    Effect,
    Child,
}
