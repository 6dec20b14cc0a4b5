//! Kind descriptor trait and metadata types
//!
//! Each behavior describes its own kind tag, category, and whether it is a
//! singleton. Built-in kinds submit a [`KindRegistration`] through
//! `inventory`, so the registry can collect them at startup without a
//! hand-maintained list.

use serde::{Deserialize, Serialize};

use crate::behavior::Behavior;
use crate::error::Result;
use crate::node::Node;
use crate::types::NodeSpec;

/// Trait for behaviors that can describe their kind
///
/// # Example
///
/// ```ignore
/// impl KindDescriptor for LightNode {
///     fn descriptor() -> KindMetadata {
///         KindMetadata::new("3d/light", KindCategory::Light, "Light")
///             .with_description("Point light placed in the host scene")
///     }
/// }
/// ```
pub trait KindDescriptor {
    /// Get the static metadata for this kind
    fn descriptor() -> KindMetadata
    where
        Self: Sized;
}

/// Category of a kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindCategory {
    /// Lights placed in the host scene
    Light,
    /// Meshes and other 3d geometry
    Mesh,
    /// Behaviors acting on a parent node
    Effect,
    /// Display surfaces and widgets
    Display,
    /// Capture sources (webcam)
    Capture,
    /// Vision processing (segmentation)
    Vision,
    /// Grouping nodes
    System,
}

/// Complete metadata for a kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindMetadata {
    /// Unique kind tag (e.g., "3d/light")
    pub kind: String,
    /// Category for grouping
    pub category: KindCategory,
    /// Human-readable label
    pub label: String,
    /// Description of what the kind does
    pub description: String,
    /// Whether every declaration shares one instance
    pub singleton: bool,
}

impl KindMetadata {
    /// Create metadata for a non-singleton kind
    pub fn new(kind: impl Into<String>, category: KindCategory, label: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            category,
            label: label.into(),
            description: String::new(),
            singleton: false,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Flag this kind as a singleton
    pub fn singleton(mut self) -> Self {
        self.singleton = true;
        self
    }
}

/// Constructor signature used by link-time registrations
pub type CreateFn = fn(&NodeSpec, Option<&Node>) -> Result<Box<dyn Behavior>>;

/// Link-time registration of a built-in kind
///
/// ```ignore
/// inventory::submit!(KindRegistration::new(LightNode::descriptor, LightNode::create));
/// ```
pub struct KindRegistration {
    descriptor: fn() -> KindMetadata,
    create: CreateFn,
}

impl KindRegistration {
    pub const fn new(descriptor: fn() -> KindMetadata, create: CreateFn) -> Self {
        Self { descriptor, create }
    }

    /// Metadata for the registered kind
    pub fn metadata(&self) -> KindMetadata {
        (self.descriptor)()
    }

    /// Constructor for the registered kind
    pub fn create_fn(&self) -> CreateFn {
        self.create
    }
}

inventory::collect!(KindRegistration);
