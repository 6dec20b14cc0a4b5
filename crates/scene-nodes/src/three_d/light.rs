//! Light Kind
//!
//! A light placed in the host scene at its `xyz` position.

use async_trait::async_trait;
use scene_engine::{
    Behavior, KindCategory, KindDescriptor, KindMetadata, KindRegistration, Node, NodeSpec, Result,
    TickContext,
};

use crate::host_entity::HostEntity;
use crate::vec3::Vec3;

/// Light
///
/// # Props
/// - `xyz` - position, defaults to the origin
/// - `color` - RGB packed into an integer, defaults to white
/// - `asset` - descriptor sent to the engine, defaults to `light`
pub struct LightNode {
    entity: HostEntity,
}

impl LightNode {
    pub const KIND: &'static str = "3d/light";
    pub const DEFAULT_COLOR: u64 = 0xffffff;

    fn create(spec: &NodeSpec, _parent: Option<&Node>) -> Result<Box<dyn Behavior>> {
        let asset = spec
            .prop("asset")
            .and_then(|v| v.as_str())
            .unwrap_or("light");
        Ok(Box::new(Self {
            entity: HostEntity::new(asset),
        }))
    }
}

impl KindDescriptor for LightNode {
    fn descriptor() -> KindMetadata {
        KindMetadata::new(Self::KIND, KindCategory::Light, "Light")
            .with_description("Point light placed in the host scene")
    }
}

inventory::submit!(KindRegistration::new(LightNode::descriptor, LightNode::create));

#[async_trait]
impl Behavior for LightNode {
    async fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<()> {
        if ctx.tick() == 1 {
            let node = ctx.node();
            let xyz = Vec3::from_value(node.prop("xyz").as_ref()).unwrap_or_default();
            let color = node
                .prop("color")
                .and_then(|v| v.as_u64())
                .unwrap_or(Self::DEFAULT_COLOR);
            node.update_props(|props| {
                props.insert("xyz".to_string(), xyz.to_value());
                props.insert("color".to_string(), color.into());
            });
        }
        self.entity.ensure(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use scene_engine::Scheduler;
    use serde_json::json;

    #[tokio::test]
    async fn test_light_normalizes_props() {
        let mut tree = testing::build(
            NodeSpec::new("sun", LightNode::KIND).with_prop("xyz", json!([1, 2, 3])),
        );
        Scheduler::default().tick(&mut tree).await;

        let sun = tree.find("sun").unwrap();
        assert_eq!(sun.prop("xyz"), Some(json!({ "x": 1.0, "y": 2.0, "z": 3.0 })));
        assert_eq!(sun.prop("color"), Some(json!(0xffffff)));
        assert!(sun.prop("entity").is_none());
    }

    #[tokio::test]
    async fn test_light_creates_entity() {
        let (mut tree, requests) = testing::build_with_engine(
            NodeSpec::new("sun", LightNode::KIND).with_prop("color", json!(0xffff00)),
        );
        let scheduler = Scheduler::default();
        scheduler.tick(&mut tree).await;
        scheduler.tick(&mut tree).await;

        let sun = tree.find("sun").unwrap();
        assert_eq!(sun.prop("entity"), Some(json!("entity:light")));
        assert_eq!(sun.prop("color"), Some(json!(0xffff00)));
        assert_eq!(*requests.lock(), vec!["create:light".to_string()]);
    }
}
