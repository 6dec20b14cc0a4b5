//! Rotate Effect
//!
//! Spins its host around one axis by `speed` radians per second.

use std::f64::consts::TAU;

use async_trait::async_trait;
use scene_engine::{
    Behavior, KindCategory, KindDescriptor, KindMetadata, KindRegistration, Node, NodeSpec, Result,
    SceneError, TickContext,
};
use serde_json::json;

use crate::vec3::{Axis, Vec3};

/// Rotate effect
///
/// Writes the host's `rotation` prop (radians per axis, wrapped to one turn)
/// and keeps its own `turns` prop counting full revolutions.
///
/// # Props
/// - `speed` - radians per second, defaults to 1
/// - `axis` - `x`, `y` or `z`, defaults to `y`
pub struct RotateEffect {
    speed: f64,
    axis: Axis,
    turns: u64,
}

impl RotateEffect {
    pub const KIND: &'static str = "3d/behavior/rotate";

    fn create(spec: &NodeSpec, parent: Option<&Node>) -> Result<Box<dyn Behavior>> {
        if parent.is_none() {
            return Err(SceneError::behavior(format!(
                "'{}' must be declared inside the node it rotates",
                spec.name
            )));
        }
        let speed = spec.prop("speed").and_then(|v| v.as_f64()).unwrap_or(1.0);
        let axis = match spec.prop("axis").and_then(|v| v.as_str()) {
            None => Axis::Y,
            Some(name) => Axis::parse(name).ok_or_else(|| {
                SceneError::behavior(format!("'{}': unknown axis '{}'", spec.name, name))
            })?,
        };
        Ok(Box::new(Self {
            speed,
            axis,
            turns: 0,
        }))
    }
}

impl KindDescriptor for RotateEffect {
    fn descriptor() -> KindMetadata {
        KindMetadata::new(Self::KIND, KindCategory::Effect, "Rotate")
            .with_description("Spins the host node around an axis")
    }
}

inventory::submit!(KindRegistration::new(RotateEffect::descriptor, RotateEffect::create));

#[async_trait]
impl Behavior for RotateEffect {
    async fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<()> {
        let host = ctx
            .parent()
            .ok_or_else(|| SceneError::behavior("rotate effect outlived its host"))?;
        let step = self.speed * ctx.delta();
        let completed = host.update_props(|props| {
            let mut rotation = Vec3::from_value(props.get("rotation")).unwrap_or_default();
            let angle = rotation.get(self.axis) + step;
            let wrapped = angle.rem_euclid(TAU);
            rotation.set(self.axis, wrapped);
            props.insert("rotation".to_string(), rotation.to_value());
            ((angle - wrapped) / TAU).round().abs() as u64
        });
        if completed > 0 {
            self.turns += completed;
            ctx.set_prop("turns", json!(self.turns));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::three_d::MeshNode;
    use scene_engine::Scheduler;
    use std::time::Duration;

    fn earth(rotate: NodeSpec) -> NodeSpec {
        NodeSpec::new("earth", MeshNode::KIND).with_child(rotate)
    }

    #[tokio::test]
    async fn test_rotates_host_each_tick() {
        let mut tree = testing::build(earth(
            NodeSpec::new("effect1", RotateEffect::KIND).with_prop("speed", json!(2.0)),
        ));
        let scheduler = Scheduler::new(Duration::from_millis(250));
        scheduler.tick(&mut tree).await;
        scheduler.tick(&mut tree).await;

        let rotation = Vec3::from_value(tree.find("earth").unwrap().prop("rotation").as_ref()).unwrap();
        assert!((rotation.y - 1.0).abs() < 1e-9);
        assert_eq!(rotation.x, 0.0);
    }

    #[tokio::test]
    async fn test_counts_full_turns() {
        let mut tree = testing::build(earth(
            NodeSpec::new("spin", RotateEffect::KIND)
                .with_prop("speed", json!(TAU))
                .with_prop("axis", json!("z")),
        ));
        let scheduler = Scheduler::new(Duration::from_millis(500));
        for _ in 0..4 {
            scheduler.tick(&mut tree).await;
        }

        assert_eq!(tree.find("earth.spin").unwrap().prop("turns"), Some(json!(2)));
        let rotation = Vec3::from_value(tree.find("earth").unwrap().prop("rotation").as_ref()).unwrap();
        assert!(rotation.z < TAU);
    }

    #[test]
    fn test_rejects_unknown_axis() {
        let spec = NodeSpec::system("root").with_child(earth(
            NodeSpec::new("spin", RotateEffect::KIND).with_prop("axis", json!("w")),
        ));
        let err = testing::builder().build(&spec).unwrap_err();
        assert!(matches!(err, SceneError::Behavior(msg) if msg.contains("unknown axis")));
    }

    #[test]
    fn test_requires_host() {
        let err = testing::builder()
            .build(&NodeSpec::new("spin", RotateEffect::KIND))
            .unwrap_err();
        assert!(matches!(err, SceneError::Behavior(_)));
    }
}
