//! Owning handle for a built scene
//!
//! A [`SceneTree`] is the only owner of a root node, its broker channels and
//! the singleton references taken while building it. Dropping the handle (or
//! calling [`SceneTree::teardown`]) releases all three.

use std::sync::Arc;

use uuid::Uuid;

use crate::bridge::HostBridge;
use crate::broker::{resolve_path, Broker, Route};
use crate::error::Result;
use crate::events::{emit, EventSink, SceneEvent};
use crate::node::Node;
use crate::scheduler::TraversalPlan;
use crate::singleton::SingletonRegistry;
use crate::types::{NodeId, NodeRole};

/// A live, wired tree of nodes
pub struct SceneTree {
    id: Uuid,
    root: Arc<Node>,
    broker: Broker,
    bridge: Option<Arc<HostBridge>>,
    singletons: Arc<SingletonRegistry>,
    leases: Vec<String>,
    events: Arc<dyn EventSink>,
    ticks: u64,
    released: bool,
}

impl SceneTree {
    pub(crate) fn new(
        root: Arc<Node>,
        broker: Broker,
        bridge: Option<Arc<HostBridge>>,
        singletons: Arc<SingletonRegistry>,
        leases: Vec<String>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            root,
            broker,
            bridge,
            singletons,
            leases,
            events,
            ticks: 0,
            released: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn root(&self) -> &Arc<Node> {
        &self.root
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    pub fn broker_mut(&mut self) -> &mut Broker {
        &mut self.broker
    }

    /// Host bridge shared by this tree's nodes, if one was attached
    pub fn bridge(&self) -> Option<&Arc<HostBridge>> {
        self.bridge.as_ref()
    }

    /// Singleton kinds referenced by this tree, one entry per declaration
    pub fn leases(&self) -> &[String] {
        &self.leases
    }

    /// Number of ticks run so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub(crate) fn advance_tick(&mut self) -> u64 {
        self.ticks += 1;
        self.ticks
    }

    /// Resolve a `.` or `/` separated path from the root
    pub fn find(&self, path: &str) -> Option<Arc<Node>> {
        resolve_path(&self.root, path)
    }

    /// Look a node up by identity
    pub fn node(&self, id: NodeId) -> Option<Arc<Node>> {
        TraversalPlan::derive(&self.root)
            .into_nodes()
            .into_iter()
            .find(|node| node.id() == id)
    }

    /// Every distinct node in traversal order
    pub fn nodes(&self) -> Vec<Arc<Node>> {
        TraversalPlan::derive(&self.root).into_nodes()
    }

    /// Identities of every distinct node in traversal order
    pub fn node_ids(&self) -> Vec<NodeId> {
        TraversalPlan::derive(&self.root).ids()
    }

    /// Register an extra wire resolved against `scope`
    pub fn register_route(&mut self, route: &str, scope: &Arc<Node>) -> Result<Route> {
        let route = self.broker.register_route(route, scope)?;
        emit(
            self.events.as_ref(),
            SceneEvent::RouteRegistered {
                tree_id: self.id.to_string(),
                route: route.to_string(),
            },
        );
        Ok(route)
    }

    /// Dispose of the tree
    pub fn teardown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let nodes = self.nodes();
        for kind in self.leases.drain(..) {
            self.singletons.release(&kind);
        }

        if let Some(bridge) = &self.bridge {
            // Shared singletons still referenced elsewhere keep their calls.
            let cancelled = nodes
                .iter()
                .filter(|node| !is_still_shared(&self.singletons, node))
                .filter(|node| bridge.cancel(node.id()))
                .count();
            if cancelled > 0 {
                log::info!("Cancelled {} in-flight bridge call(s) on teardown", cancelled);
            }
        }

        self.broker.clear();
        log::info!("Scene tree {} torn down after {} ticks", self.id, self.ticks);
        emit(
            self.events.as_ref(),
            SceneEvent::TreeTornDown {
                tree_id: self.id.to_string(),
                ticks: self.ticks,
            },
        );
    }
}

fn is_still_shared(singletons: &SingletonRegistry, node: &Arc<Node>) -> bool {
    node.role() == NodeRole::Singleton
        && singletons
            .instance(node.kind())
            .is_some_and(|live| Arc::ptr_eq(&live, node))
}

impl Drop for SceneTree {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for SceneTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneTree")
            .field("id", &self.id)
            .field("root", &self.root.id())
            .field("routes", &self.broker.routes().len())
            .field("leases", &self.leases)
            .field("ticks", &self.ticks)
            .finish()
    }
}
