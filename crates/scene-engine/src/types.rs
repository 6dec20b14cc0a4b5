//! Core types for declarative node trees
//!
//! A [`NodeSpec`] is the parsed, read-only description of one declared entry.
//! Runtime nodes are created from specs by the tree builder.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Property bag carried by specs and nodes
pub type Props = serde_json::Map<String, Value>;

/// A broker message
pub type Message = Value;

/// Kind tag for grouping entries that declare no kind of their own
pub const SYSTEM_KIND: &str = "system";

/// Kind path segment marking an effect (e.g. `3d/behavior/rotate`)
pub const EFFECT_SEGMENT: &str = "behavior";

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier for a runtime node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Reserved caller id for operations issued by the runtime itself
    pub const HOST: NodeId = NodeId(0);

    pub(crate) fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// How a node sits in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Ordinary child owned by its parent
    Standalone,
    /// Acts on its host's state; holds a weak back-reference to it
    Effect,
    /// Shared instance owned by the singleton registry
    Singleton,
}

/// Split a namespaced kind into its path segments.
///
/// Both `3d/behavior/rotate` and `display::box` styles are accepted.
pub fn kind_segments(kind: &str) -> impl Iterator<Item = &str> {
    kind.split("::")
        .flat_map(|part| part.split('/'))
        .filter(|segment| !segment.is_empty())
}

/// Whether a kind names an effect by convention
pub fn is_effect_kind(kind: &str) -> bool {
    kind_segments(kind).any(|segment| segment == EFFECT_SEGMENT)
}

/// Declarative description of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Declared entry name, used for route path resolution
    pub name: String,
    /// Kind tag selecting the behavior
    pub kind: String,
    /// Declared properties
    #[serde(default)]
    pub props: Props,
    /// Nested entries, effects included, in declaration order
    #[serde(default)]
    pub children: Vec<NodeSpec>,
    /// Wires declared in this node's scope
    #[serde(default)]
    pub routes: Vec<String>,
}

impl NodeSpec {
    /// Create a spec with no props or children
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            props: Props::new(),
            children: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// Create a grouping spec of the built-in `system` kind
    pub fn system(name: impl Into<String>) -> Self {
        Self::new(name, SYSTEM_KIND)
    }

    /// Set a property
    pub fn with_prop(mut self, key: impl Into<String>, value: Value) -> Self {
        self.props.insert(key.into(), value);
        self
    }

    /// Append a nested entry
    pub fn with_child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    /// Declare a wire in this scope
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.routes.push(route.into());
        self
    }

    /// Whether this spec declares an effect
    pub fn is_effect(&self) -> bool {
        is_effect_kind(&self.kind)
    }

    /// Look up a declared property
    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    /// Number of specs in this subtree, this one included
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(NodeSpec::count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_segments_mixed_delimiters() {
        let segments: Vec<&str> = kind_segments("3d/behavior/rotate").collect();
        assert_eq!(segments, vec!["3d", "behavior", "rotate"]);

        let segments: Vec<&str> = kind_segments("display::box").collect();
        assert_eq!(segments, vec!["display", "box"]);
    }

    #[test]
    fn test_effect_convention() {
        assert!(is_effect_kind("3d/behavior/rotate"));
        assert!(is_effect_kind("3d/behavior/collide"));
        assert!(!is_effect_kind("3d/mesh"));
        assert!(!is_effect_kind("behaviorless/mesh"));
        assert!(!is_effect_kind("webcam::singleton"));
    }

    #[test]
    fn test_node_ids_are_unique() {
        let a = NodeId::next();
        let b = NodeId::next();
        assert_ne!(a, b);
        assert!(b > a);
        assert_eq!(NodeId::HOST.to_string(), "n0");
    }

    #[test]
    fn test_spec_builder() {
        let spec = NodeSpec::new("earth", "3d/mesh")
            .with_prop("asset", json!("cube"))
            .with_child(NodeSpec::new("spin", "3d/behavior/rotate"))
            .with_route("a -> b");

        assert_eq!(spec.prop("asset"), Some(&json!("cube")));
        assert!(spec.children[0].is_effect());
        assert_eq!(spec.routes, vec!["a -> b".to_string()]);
        assert_eq!(spec.count(), 2);
    }
}
