//! Kind registry for tag-driven dispatch
//!
//! Maps kind strings to metadata and factories. Resolution happens once per
//! node at build time; the scheduler never looks a kind up per tick.
//!
//! # Usage
//!
//! ```ignore
//! use scene_engine::{KindRegistry, KindMetadata, KindCategory};
//!
//! let mut registry = KindRegistry::new();
//! registry.register_fn(
//!     KindMetadata::new("3d/light", KindCategory::Light, "Light"),
//!     |_spec, _parent| Ok(Box::new(MyLight::default())),
//! )?;
//!
//! let builder = TreeBuilder::new(Arc::new(registry));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::behavior::{Behavior, TickContext};
use crate::descriptor::{KindCategory, KindDescriptor, KindMetadata, KindRegistration};
use crate::error::{Result, SceneError};
use crate::node::Node;
use crate::types::{NodeSpec, SYSTEM_KIND};

/// Factory for a kind's behavior instances
///
/// Receives the node's spec and, when the node is nested, its parent, whose
/// props are already readable.
pub trait KindFactory: Send + Sync {
    fn create(&self, spec: &NodeSpec, parent: Option<&Node>) -> Result<Box<dyn Behavior>>;
}

impl<F> KindFactory for F
where
    F: Fn(&NodeSpec, Option<&Node>) -> Result<Box<dyn Behavior>> + Send + Sync,
{
    fn create(&self, spec: &NodeSpec, parent: Option<&Node>) -> Result<Box<dyn Behavior>> {
        self(spec, parent)
    }
}

/// A registration entry combining metadata with its factory
struct RegistryEntry {
    metadata: KindMetadata,
    factory: Arc<dyn KindFactory>,
}

/// Registry of kinds with their metadata and factories
///
/// A fresh registry already knows the built-in `system` kind used for
/// entries that declare no kind. Every other kind must be registered before
/// a tree is built; the builder takes the registry behind an `Arc`, so it
/// cannot change once building starts.
pub struct KindRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl KindRegistry {
    /// Create a registry holding only the `system` kind
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            SYSTEM_KIND.to_string(),
            RegistryEntry {
                metadata: SystemGroup::descriptor(),
                factory: Arc::new(SystemGroup::create),
            },
        );
        Self { entries }
    }

    /// Create a registry with every kind submitted through `inventory`
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        for registration in inventory::iter::<KindRegistration> {
            registry.register(registration.metadata(), Arc::new(registration.create_fn()))?;
        }
        log::debug!("Kind registry loaded {} kinds", registry.entries.len());
        Ok(registry)
    }

    /// Register a kind with metadata and a factory
    ///
    /// Fails with `DuplicateKind` rather than shadowing an existing entry.
    pub fn register(&mut self, metadata: KindMetadata, factory: Arc<dyn KindFactory>) -> Result<()> {
        if self.entries.contains_key(&metadata.kind) {
            return Err(SceneError::DuplicateKind(metadata.kind));
        }
        self.entries
            .insert(metadata.kind.clone(), RegistryEntry { metadata, factory });
        Ok(())
    }

    /// Register a kind backed by a closure
    pub fn register_fn<F>(&mut self, metadata: KindMetadata, factory: F) -> Result<()>
    where
        F: Fn(&NodeSpec, Option<&Node>) -> Result<Box<dyn Behavior>> + Send + Sync + 'static,
    {
        self.register(metadata, Arc::new(factory))
    }

    /// Resolve the factory for a kind
    pub fn resolve(&self, kind: &str) -> Result<Arc<dyn KindFactory>> {
        self.entries
            .get(kind)
            .map(|entry| entry.factory.clone())
            .ok_or_else(|| SceneError::UnknownKind(kind.to_string()))
    }

    /// Get metadata for a kind
    pub fn metadata(&self, kind: &str) -> Option<&KindMetadata> {
        self.entries.get(kind).map(|e| &e.metadata)
    }

    /// Get all registered metadata
    pub fn all_metadata(&self) -> Vec<&KindMetadata> {
        self.entries.values().map(|e| &e.metadata).collect()
    }

    /// Get metadata grouped by category
    pub fn metadata_by_category(&self) -> HashMap<KindCategory, Vec<&KindMetadata>> {
        let mut grouped: HashMap<KindCategory, Vec<&KindMetadata>> = HashMap::new();
        for entry in self.entries.values() {
            grouped
                .entry(entry.metadata.category)
                .or_default()
                .push(&entry.metadata);
        }
        grouped
    }

    /// Check if a kind is registered
    pub fn has_kind(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    /// All registered kind tags, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Kinds flagged as singletons, sorted
    pub fn singleton_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self
            .entries
            .values()
            .filter(|e| e.metadata.singleton)
            .map(|e| e.metadata.kind.as_str())
            .collect();
        kinds.sort_unstable();
        kinds
    }

    /// Merge another registry into this one
    ///
    /// Fails without modifying `self` if any kind other than `system` is
    /// present in both.
    pub fn merge(&mut self, other: KindRegistry) -> Result<()> {
        if let Some(kind) = other
            .entries
            .keys()
            .find(|kind| kind.as_str() != SYSTEM_KIND && self.entries.contains_key(*kind))
        {
            return Err(SceneError::DuplicateKind(kind.clone()));
        }
        self.entries.extend(
            other
                .entries
                .into_iter()
                .filter(|(kind, _)| kind != SYSTEM_KIND),
        );
        Ok(())
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Built-in grouping behavior for entries without a kind
///
/// Holds children and routes; does nothing on its own.
pub struct SystemGroup;

impl SystemGroup {
    fn create(_spec: &NodeSpec, _parent: Option<&Node>) -> Result<Box<dyn Behavior>> {
        Ok(Box::new(SystemGroup))
    }
}

impl KindDescriptor for SystemGroup {
    fn descriptor() -> KindMetadata {
        KindMetadata::new(SYSTEM_KIND, KindCategory::System, "System")
            .with_description("Groups nested entries and scopes their wires")
    }
}

#[async_trait]
impl Behavior for SystemGroup {
    async fn update(&mut self, _ctx: &mut TickContext<'_>) -> Result<()> {
        Ok(())
    }
}
