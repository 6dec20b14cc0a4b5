use async_trait::async_trait;
use scene_engine::{
    Behavior, KindCategory, KindDescriptor, KindMetadata, KindRegistration, Node, NodeSpec, Result,
    TickContext,
};
use serde_json::{json, Value};

use super::remember;

/// Button
///
/// Publishes `{"event": "press", "text": <text prop>}` for every `press`
/// message it receives, either the string `"press"` or an object with
/// `"event": "press"`. Presses are counted in `presses`.
pub struct ButtonNode {
    presses: u64,
}

impl ButtonNode {
    pub const KIND: &'static str = "display::button";
    pub const PRESS: &'static str = "press";

    fn create(_spec: &NodeSpec, _parent: Option<&Node>) -> Result<Box<dyn Behavior>> {
        Ok(Box::new(Self { presses: 0 }))
    }
}

fn is_press(message: &Value) -> bool {
    match message {
        Value::String(event) => event == ButtonNode::PRESS,
        Value::Object(fields) => fields.get("event").and_then(Value::as_str) == Some(ButtonNode::PRESS),
        _ => false,
    }
}

impl KindDescriptor for ButtonNode {
    fn descriptor() -> KindMetadata {
        KindMetadata::new(Self::KIND, KindCategory::Display, "Button")
            .with_description("Pressable button publishing its label")
    }
}

inventory::submit!(KindRegistration::new(ButtonNode::descriptor, ButtonNode::create));

#[async_trait]
impl Behavior for ButtonNode {
    async fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<()> {
        for message in ctx.take_inbox() {
            remember(ctx, &message);
            if !is_press(&message) {
                continue;
            }
            let text = ctx.prop("text").unwrap_or_else(|| json!(""));
            log::debug!("{} '{}' pressed", ctx.id(), ctx.node().name());
            ctx.publish(json!({ "event": Self::PRESS, "text": text }));
            self.presses += 1;
            ctx.set_prop("presses", json!(self.presses));
        }
        Ok(())
    }
}
