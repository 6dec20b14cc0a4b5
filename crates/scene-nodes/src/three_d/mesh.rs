//! Mesh Kind
//!
//! A mesh instantiated in the host scene from an asset name. The mesh moves
//! by its `velocity` every tick; effects attached to it (rotate, collide)
//! run right after it and act on the same props.

use async_trait::async_trait;
use scene_engine::{
    Behavior, KindCategory, KindDescriptor, KindMetadata, KindRegistration, Node, NodeSpec, Result,
    TickContext,
};

use crate::host_entity::HostEntity;
use crate::vec3::Vec3;

/// Mesh
///
/// # Props
/// - `asset` - primitive or model file to instantiate, defaults to `cube`
/// - `xyz` - position, updated every tick
/// - `velocity` - units per second, defaults to zero
pub struct MeshNode {
    entity: HostEntity,
}

impl MeshNode {
    pub const KIND: &'static str = "3d/mesh";
    pub const DEFAULT_ASSET: &'static str = "cube";

    fn create(spec: &NodeSpec, _parent: Option<&Node>) -> Result<Box<dyn Behavior>> {
        let asset = spec
            .prop("asset")
            .and_then(|v| v.as_str())
            .unwrap_or(Self::DEFAULT_ASSET);
        Ok(Box::new(Self {
            entity: HostEntity::new(asset),
        }))
    }
}

impl KindDescriptor for MeshNode {
    fn descriptor() -> KindMetadata {
        KindMetadata::new(Self::KIND, KindCategory::Mesh, "Mesh")
            .with_description("Geometry instantiated in the host scene from an asset")
    }
}

inventory::submit!(KindRegistration::new(MeshNode::descriptor, MeshNode::create));

#[async_trait]
impl Behavior for MeshNode {
    async fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<()> {
        let delta = ctx.delta();
        ctx.node().update_props(|props| {
            let xyz = Vec3::from_value(props.get("xyz")).unwrap_or_default();
            let velocity = Vec3::from_value(props.get("velocity")).unwrap_or_default();
            props.insert("xyz".to_string(), xyz.add(velocity.scale(delta)).to_value());
        });
        self.entity.ensure(ctx).await
    }
}
