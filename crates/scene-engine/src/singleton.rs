//! Shared instances for singleton kinds
//!
//! Every declaration of a singleton kind resolves to one node. The registry
//! counts references (one per declaration that resolved to it) so the
//! instance is dropped when the last referencing tree is torn down.
//!
//! Construction is serialized: a build pass holds the construction lock for
//! as long as it takes to create a missing instance, so two branches (or two
//! threads) asking for the same kind can never both construct it. The lock
//! is reentrant because building a singleton's subtree may itself need
//! another singleton.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};

use crate::error::{Result, SceneError};
use crate::node::Node;
use crate::registry::KindRegistry;
use crate::types::NodeSpec;

struct SingletonEntry {
    node: Arc<Node>,
    declared: NodeSpec,
    references: usize,
}

impl SingletonEntry {
    /// Declarations may differ in name only
    fn matches(&self, spec: &NodeSpec) -> bool {
        self.declared.props == spec.props
            && self.declared.children == spec.children
            && self.declared.routes == spec.routes
    }
}

/// Registry of live singleton instances
pub struct SingletonRegistry {
    kinds: HashSet<String>,
    construction: ReentrantMutex<()>,
    entries: Mutex<HashMap<String, SingletonEntry>>,
    constructing: Mutex<HashSet<String>>,
}

impl SingletonRegistry {
    /// Create a registry for an explicit set of singleton kinds
    pub fn new<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
            construction: ReentrantMutex::new(()),
            entries: Mutex::new(HashMap::new()),
            constructing: Mutex::new(HashSet::new()),
        }
    }

    /// Create a registry for the kinds flagged singleton in `registry`
    pub fn from_registry(registry: &KindRegistry) -> Self {
        Self::new(registry.singleton_kinds())
    }

    pub fn is_singleton(&self, kind: &str) -> bool {
        self.kinds.contains(kind)
    }

    /// Return the live instance for `spec.kind`, constructing it with `create` if needed.
    ///
    /// Each successful call takes one reference, to be returned with
    /// [`release`](Self::release). A request whose props, children or routes
    /// differ from the first declaration fails with `SingletonConflict`.
    pub fn get_or_create<F>(&self, spec: &NodeSpec, create: F) -> Result<Arc<Node>>
    where
        F: FnOnce(&NodeSpec) -> Result<Arc<Node>>,
    {
        let _construction = self.construction.lock();

        if let Some(entry) = self.entries.lock().get_mut(&spec.kind) {
            if !entry.matches(spec) {
                return Err(SceneError::SingletonConflict {
                    kind: spec.kind.clone(),
                });
            }
            entry.references += 1;
            log::debug!(
                "Singleton '{}' shared ({} references)",
                spec.kind,
                entry.references
            );
            return Ok(entry.node.clone());
        }

        // A singleton declared inside its own subtree would otherwise be built twice.
        if !self.constructing.lock().insert(spec.kind.clone()) {
            return Err(SceneError::SingletonConflict {
                kind: spec.kind.clone(),
            });
        }
        let created = create(spec);
        self.constructing.lock().remove(&spec.kind);
        let node = created?;

        log::info!("Singleton '{}' created as {}", spec.kind, node.id());
        self.entries.lock().insert(
            spec.kind.clone(),
            SingletonEntry {
                node: node.clone(),
                declared: spec.clone(),
                references: 1,
            },
        );
        Ok(node)
    }

    /// Drop one reference to a singleton.
    ///
    /// Returns true when that was the last reference and the instance was
    /// removed.
    pub fn release(&self, kind: &str) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(kind) else {
            return false;
        };
        entry.references = entry.references.saturating_sub(1);
        if entry.references > 0 {
            return false;
        }
        if let Some(entry) = entries.remove(kind) {
            log::info!("Singleton '{}' ({}) torn down", kind, entry.node.id());
        }
        true
    }

    /// The live instance for a kind, if any
    pub fn instance(&self, kind: &str) -> Option<Arc<Node>> {
        self.entries.lock().get(kind).map(|e| e.node.clone())
    }

    pub fn reference_count(&self, kind: &str) -> usize {
        self.entries.lock().get(kind).map_or(0, |e| e.references)
    }

    /// Kinds with a live instance, sorted
    pub fn live_kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.entries.lock().keys().cloned().collect();
        kinds.sort_unstable();
        kinds
    }
}

impl std::fmt::Debug for SingletonRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingletonRegistry")
            .field("kinds", &self.kinds)
            .field("live", &self.live_kinds())
            .finish()
    }
}
