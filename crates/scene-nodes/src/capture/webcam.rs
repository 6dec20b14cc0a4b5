//! Webcam Singleton
//!
//! Stands in for the camera feed. Every declaration of `webcam::singleton`
//! in a tree (or in trees sharing a singleton registry) is the same node, so
//! frames are produced once per tick no matter how many apps reference it.

use async_trait::async_trait;
use scene_engine::{
    Behavior, KindCategory, KindDescriptor, KindMetadata, KindRegistration, Node, NodeSpec, Result,
    SceneError, TickContext,
};
use serde_json::{json, Value};

use crate::host_entity::HostEntity;

/// Webcam
///
/// Publishes `frame#<n>` with `n` counting from 1, and mirrors the count in
/// its `frames` prop. Asks the engine for a `camera` entity.
///
/// # Props
/// - `interval` - ticks between frames, defaults to 1
pub struct WebcamNode {
    interval: u64,
    frames: u64,
    entity: HostEntity,
}

impl WebcamNode {
    pub const KIND: &'static str = "webcam::singleton";

    fn create(spec: &NodeSpec, _parent: Option<&Node>) -> Result<Box<dyn Behavior>> {
        let interval = match spec.prop("interval") {
            None => 1,
            Some(value) => value.as_u64().filter(|&n| n > 0).ok_or_else(|| {
                SceneError::behavior(format!(
                    "'{}': interval must be a positive integer, got {}",
                    spec.name, value
                ))
            })?,
        };
        Ok(Box::new(Self {
            interval,
            frames: 0,
            entity: HostEntity::new("camera"),
        }))
    }

    /// Message published for frame `n`
    pub fn frame(n: u64) -> Value {
        json!(format!("frame#{}", n))
    }
}

impl KindDescriptor for WebcamNode {
    fn descriptor() -> KindMetadata {
        KindMetadata::new(Self::KIND, KindCategory::Capture, "Webcam")
            .with_description("Shared camera publishing numbered frames")
            .singleton()
    }
}

inventory::submit!(KindRegistration::new(WebcamNode::descriptor, WebcamNode::create));

#[async_trait]
impl Behavior for WebcamNode {
    async fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<()> {
        if ctx.tick().saturating_sub(1) % self.interval == 0 {
            self.frames += 1;
            ctx.publish(Self::frame(self.frames));
            ctx.set_prop("frames", json!(self.frames));
        }
        self.entity.ensure(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use scene_engine::Scheduler;

    #[tokio::test]
    async fn test_webcam_frames_follow_interval() {
        let mut tree = testing::build(
            NodeSpec::new("camera", WebcamNode::KIND).with_prop("interval", json!(2)),
        );
        let scheduler = Scheduler::default();
        let mut published = Vec::new();
        for _ in 0..5 {
            published.push(scheduler.tick(&mut tree).await.published);
        }

        assert_eq!(published, vec![1, 0, 1, 0, 1]);
        assert_eq!(tree.find("camera").unwrap().prop("frames"), Some(json!(3)));
    }

    #[tokio::test]
    async fn test_webcam_creates_camera_entity() {
        let (mut tree, requests) =
            testing::build_with_engine(NodeSpec::new("camera", WebcamNode::KIND));
        let report = Scheduler::default().tick(&mut tree).await;

        assert!(report.is_clean());
        assert_eq!(report.published, 1);
        assert_eq!(tree.find("camera").unwrap().prop("entity"), Some(json!("entity:camera")));
        assert_eq!(*requests.lock(), vec!["create:camera".to_string()]);
    }

    #[tokio::test]
    async fn test_webcam_handles_tick_zero() {
        let spec = NodeSpec::new("camera", WebcamNode::KIND).with_prop("interval", json!(3));
        let tree = testing::build(spec.clone());
        let node = tree.find("camera").unwrap();
        let mut behavior = WebcamNode::create(&spec, None).unwrap();

        let mut ctx = TickContext::new(&node, 0, 0.016);
        behavior.update(&mut ctx).await.unwrap();
        assert_eq!(ctx.published(), &[WebcamNode::frame(1)]);
    }

    #[test]
    fn test_webcam_rejects_zero_interval() {
        let spec = NodeSpec::system("root")
            .with_child(NodeSpec::new("camera", WebcamNode::KIND).with_prop("interval", json!(0)));
        assert!(testing::builder().build(&spec).is_err());
    }
}
