//! Collide Effect
//!
//! Keeps its host inside an axis-aligned box. When the host's `xyz` leaves
//! the box it is clamped back to the wall and its `velocity` along that axis
//! is reflected.

use async_trait::async_trait;
use scene_engine::{
    Behavior, KindCategory, KindDescriptor, KindMetadata, KindRegistration, Node, NodeSpec, Result,
    SceneError, TickContext,
};
use serde_json::{json, Value};

use crate::vec3::{Axis, Vec3};

/// Collide effect
///
/// Publishes `{"event": "collide", "node": <host name>, "axis": <axis>}` for
/// every wall hit and counts hits in its own `collisions` prop.
///
/// # Props
/// - `bounds` - `{"min": xyz, "max": xyz}`, defaults to a 20 unit cube around the origin
/// - `bounce` - fraction of speed kept after a hit, defaults to 1
/// - `topic` - broker topic that also receives every hit event
pub struct CollideEffect {
    min: Vec3,
    max: Vec3,
    bounce: f64,
    topic: Option<String>,
    collisions: u64,
}

impl CollideEffect {
    pub const KIND: &'static str = "3d/behavior/collide";
    pub const DEFAULT_EXTENT: f64 = 10.0;

    fn create(spec: &NodeSpec, parent: Option<&Node>) -> Result<Box<dyn Behavior>> {
        if parent.is_none() {
            return Err(SceneError::behavior(format!(
                "'{}' must be declared inside the node it constrains",
                spec.name
            )));
        }
        let bounds = spec.prop("bounds");
        let min = Vec3::from_value(bounds.and_then(|b| b.get("min")))
            .unwrap_or(Vec3::splat(-Self::DEFAULT_EXTENT));
        let max = Vec3::from_value(bounds.and_then(|b| b.get("max")))
            .unwrap_or(Vec3::splat(Self::DEFAULT_EXTENT));
        if Axis::ALL.iter().any(|&axis| min.get(axis) > max.get(axis)) {
            return Err(SceneError::behavior(format!(
                "'{}': bounds min exceeds max",
                spec.name
            )));
        }
        let bounce = spec.prop("bounce").and_then(Value::as_f64).unwrap_or(1.0);
        Ok(Box::new(Self {
            min,
            max,
            bounce,
            topic: spec.prop("topic").and_then(Value::as_str).map(str::to_string),
            collisions: 0,
        }))
    }
}

impl KindDescriptor for CollideEffect {
    fn descriptor() -> KindMetadata {
        KindMetadata::new(Self::KIND, KindCategory::Effect, "Collide")
            .with_description("Bounces the host node off the walls of a box")
    }
}

inventory::submit!(KindRegistration::new(CollideEffect::descriptor, CollideEffect::create));

#[async_trait]
impl Behavior for CollideEffect {
    async fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<()> {
        let host = ctx
            .parent()
            .cloned()
            .ok_or_else(|| SceneError::behavior("collide effect outlived its host"))?;

        let hits = host.update_props(|props| {
            let mut xyz = Vec3::from_value(props.get("xyz")).unwrap_or_default();
            let mut velocity = Vec3::from_value(props.get("velocity")).unwrap_or_default();
            let mut hits = Vec::new();
            for axis in Axis::ALL {
                let (low, high) = (self.min.get(axis), self.max.get(axis));
                let position = xyz.get(axis);
                let speed = velocity.get(axis).abs() * self.bounce;
                if position < low {
                    xyz.set(axis, low);
                    velocity.set(axis, speed);
                    hits.push(axis);
                } else if position > high {
                    xyz.set(axis, high);
                    velocity.set(axis, -speed);
                    hits.push(axis);
                }
            }
            if !hits.is_empty() {
                props.insert("xyz".to_string(), xyz.to_value());
                props.insert("velocity".to_string(), velocity.to_value());
            }
            hits
        });

        for axis in &hits {
            log::debug!("'{}' hit the {} wall", host.name(), axis.name());
            let event = json!({
                "event": "collide",
                "node": host.name(),
                "axis": axis.name(),
            });
            if let Some(topic) = &self.topic {
                ctx.publish_topic(topic.as_str(), event.clone());
            }
            ctx.publish(event);
        }
        if !hits.is_empty() {
            self.collisions += hits.len() as u64;
            ctx.set_prop("collisions", json!(self.collisions));
        }
        Ok(())
    }
}
