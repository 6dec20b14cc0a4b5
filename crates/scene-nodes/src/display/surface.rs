use async_trait::async_trait;
use scene_engine::{
    Behavior, KindCategory, KindDescriptor, KindMetadata, KindRegistration, Node, NodeSpec, Result,
    TickContext,
};
use serde_json::json;

use super::{remember, DEFAULT_SIZE};

/// Display surface
///
/// Counts incoming messages in `painted`, the number of repaints a renderer
/// would have done.
///
/// # Props
/// - `width`, `height` - pixels, default 600
pub struct DisplayNode {
    painted: u64,
}

impl DisplayNode {
    pub const KIND: &'static str = "display";

    fn create(_spec: &NodeSpec, _parent: Option<&Node>) -> Result<Box<dyn Behavior>> {
        Ok(Box::new(Self { painted: 0 }))
    }
}

impl KindDescriptor for DisplayNode {
    fn descriptor() -> KindMetadata {
        KindMetadata::new(Self::KIND, KindCategory::Display, "Display")
            .with_description("Surface hosting boxes, text and buttons")
    }
}

inventory::submit!(KindRegistration::new(DisplayNode::descriptor, DisplayNode::create));

#[async_trait]
impl Behavior for DisplayNode {
    async fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<()> {
        if ctx.tick() == 1 {
            let node = ctx.node();
            let width = node.prop_f64("width", DEFAULT_SIZE);
            let height = node.prop_f64("height", DEFAULT_SIZE);
            node.update_props(|props| {
                props.insert("width".to_string(), json!(width));
                props.insert("height".to_string(), json!(height));
            });
        }
        let inbox = ctx.take_inbox();
        if let Some(message) = inbox.last() {
            remember(ctx, message);
            self.painted += inbox.len() as u64;
            ctx.set_prop("painted", json!(self.painted));
        }
        Ok(())
    }
}
