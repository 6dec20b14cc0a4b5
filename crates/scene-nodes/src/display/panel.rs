use async_trait::async_trait;
use scene_engine::{
    Behavior, KindCategory, KindDescriptor, KindMetadata, KindRegistration, Node, NodeSpec, Result,
    TickContext,
};
use serde_json::{json, Value};

use super::{remember, DEFAULT_SIZE};

/// Box panel
///
/// Fills its container unless sized explicitly: an undeclared `width` or
/// `height` is taken from the parent at build time. Incoming messages are
/// kept in `last` and counted in `received`.
pub struct BoxNode {
    size: Option<(f64, f64)>,
    received: u64,
}

impl BoxNode {
    pub const KIND: &'static str = "display::box";

    fn create(spec: &NodeSpec, parent: Option<&Node>) -> Result<Box<dyn Behavior>> {
        let dimension = |key: &str| {
            spec.prop(key)
                .and_then(Value::as_f64)
                .or_else(|| parent.and_then(|p| p.prop(key)).and_then(|v| v.as_f64()))
                .unwrap_or(DEFAULT_SIZE)
        };
        Ok(Box::new(Self {
            size: Some((dimension("width"), dimension("height"))),
            received: 0,
        }))
    }
}

impl KindDescriptor for BoxNode {
    fn descriptor() -> KindMetadata {
        KindMetadata::new(Self::KIND, KindCategory::Display, "Box")
            .with_description("Rectangular panel grouping other widgets")
    }
}

inventory::submit!(KindRegistration::new(BoxNode::descriptor, BoxNode::create));

#[async_trait]
impl Behavior for BoxNode {
    async fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<()> {
        if let Some((width, height)) = self.size.take() {
            ctx.node().update_props(|props| {
                props.insert("width".to_string(), json!(width));
                props.insert("height".to_string(), json!(height));
            });
        }
        let inbox = ctx.take_inbox();
        if let Some(message) = inbox.last() {
            remember(ctx, message);
            self.received += inbox.len() as u64;
            ctx.set_prop("received", json!(self.received));
        }
        Ok(())
    }
}
