//! Runtime nodes
//!
//! A [`Node`] is created once by the tree builder (or shared through the
//! singleton registry) and owns its children and effects. Effects keep a
//! [`Weak`] reference back to their host; ownership only flows downward.
//!
//! Structure is write-once: `children` and `effects` are filled by the
//! builder and frozen afterwards. Only `props` and the behavior's own state
//! change while the tree runs.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::behavior::Behavior;
use crate::types::{NodeId, NodeRole, NodeSpec, Props};

/// A child or effect together with the name it was declared under
#[derive(Clone)]
pub struct Attached {
    name: String,
    node: Arc<Node>,
}

impl Attached {
    pub fn new(name: impl Into<String>, node: Arc<Node>) -> Self {
        Self {
            name: name.into(),
            node,
        }
    }

    /// Name declared in the parent's scope
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }
}

impl fmt::Debug for Attached {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attached")
            .field("name", &self.name)
            .field("node", &self.node.id)
            .finish()
    }
}

/// A live node in a scene tree
pub struct Node {
    id: NodeId,
    name: String,
    kind: String,
    role: NodeRole,
    props: RwLock<Props>,
    parent: Weak<Node>,
    children: OnceLock<Vec<Attached>>,
    effects: OnceLock<Vec<Attached>>,
    behavior: Mutex<Box<dyn Behavior>>,
}

impl Node {
    pub(crate) fn new(
        spec: &NodeSpec,
        role: NodeRole,
        parent: Weak<Node>,
        behavior: Box<dyn Behavior>,
    ) -> Self {
        Self {
            id: NodeId::next(),
            name: spec.name.clone(),
            kind: spec.kind.clone(),
            role,
            props: RwLock::new(spec.props.clone()),
            parent,
            children: OnceLock::new(),
            effects: OnceLock::new(),
            behavior: Mutex::new(behavior),
        }
    }

    /// Freeze the structure built for this node.
    ///
    /// Returns false if the node was already attached.
    pub(crate) fn attach(&self, children: Vec<Attached>, effects: Vec<Attached>) -> bool {
        let children_set = self.children.set(children).is_ok();
        let effects_set = self.effects.set(effects).is_ok();
        children_set && effects_set
    }

    pub(crate) fn behavior(&self) -> &Mutex<Box<dyn Behavior>> {
        &self.behavior
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Name of the declaration that created this node
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    /// Host node, if this node is attached under one still alive
    pub fn parent(&self) -> Option<Arc<Node>> {
        self.parent.upgrade()
    }

    pub fn children(&self) -> &[Attached] {
        self.children.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn effects(&self) -> &[Attached] {
        self.effects.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Find a child or effect by its declared name
    pub fn child(&self, name: &str) -> Option<&Arc<Node>> {
        self.children()
            .iter()
            .chain(self.effects())
            .find(|attached| attached.name() == name)
            .map(Attached::node)
    }

    /// Read a single property
    pub fn prop(&self, key: &str) -> Option<Value> {
        self.props.read().get(key).cloned()
    }

    /// Read a numeric property, falling back to `default`
    pub fn prop_f64(&self, key: &str, default: f64) -> f64 {
        self.props
            .read()
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or(default)
    }

    /// Write a single property
    pub fn set_prop(&self, key: impl Into<String>, value: Value) {
        self.props.write().insert(key.into(), value);
    }

    /// Mutate properties in place
    pub fn update_props<R>(&self, f: impl FnOnce(&mut Props) -> R) -> R {
        f(&mut self.props.write())
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("role", &self.role)
            .field("children", &self.children())
            .field("effects", &self.effects())
            .finish()
    }
}
