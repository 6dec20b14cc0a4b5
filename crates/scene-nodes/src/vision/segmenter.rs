//! Segmenter Singleton
//!
//! Consumes camera frames and reports a segmentation result for each one.
//! The actual mask computation belongs to the external engine.

use async_trait::async_trait;
use scene_engine::{
    Behavior, KindCategory, KindDescriptor, KindMetadata, KindRegistration, Node, NodeSpec, Result,
    TickContext,
};
use serde_json::json;

/// Segmenter
///
/// For every frame received publishes `{"event": "segmented", "frame": <frame>}`.
/// Keeps `frames_seen` and `last_frame` props.
pub struct SegmenterNode {
    frames_seen: u64,
}

impl SegmenterNode {
    pub const KIND: &'static str = "segmenter::singleton";

    fn create(_spec: &NodeSpec, _parent: Option<&Node>) -> Result<Box<dyn Behavior>> {
        Ok(Box::new(Self { frames_seen: 0 }))
    }
}

impl KindDescriptor for SegmenterNode {
    fn descriptor() -> KindMetadata {
        KindMetadata::new(Self::KIND, KindCategory::Vision, "Segmenter")
            .with_description("Shared face segmenter fed by camera frames")
            .singleton()
    }
}

inventory::submit!(KindRegistration::new(SegmenterNode::descriptor, SegmenterNode::create));

#[async_trait]
impl Behavior for SegmenterNode {
    async fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<()> {
        let frames = ctx.take_inbox();
        let Some(last) = frames.last().cloned() else {
            return Ok(());
        };
        for frame in frames {
            ctx.publish(json!({ "event": "segmented", "frame": frame }));
        }
        self.frames_seen += ctx.published().len() as u64;
        ctx.set_prop("frames_seen", json!(self.frames_seen));
        ctx.set_prop("last_frame", last);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::WebcamNode;
    use crate::testing;
    use scene_engine::Scheduler;

    #[tokio::test]
    async fn test_segmenter_reports_each_frame() {
        let mut tree = testing::build(
            NodeSpec::system("app")
                .with_child(NodeSpec::new("camera", WebcamNode::KIND))
                .with_child(NodeSpec::new("segmenter", SegmenterNode::KIND))
                .with_route("camera -> segmenter"),
        );
        let scheduler = Scheduler::default();
        scheduler.tick(&mut tree).await;
        let report = scheduler.tick(&mut tree).await;

        let segmenter = tree.find("app.segmenter").unwrap();
        assert_eq!(segmenter.prop("frames_seen"), Some(json!(2)));
        assert_eq!(segmenter.prop("last_frame"), Some(json!("frame#2")));
        // One frame plus one segmentation result.
        assert_eq!(report.published, 2);
    }
}
