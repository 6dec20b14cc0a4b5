use async_trait::async_trait;
use scene_engine::{
    Behavior, KindCategory, KindDescriptor, KindMetadata, KindRegistration, Node, NodeSpec, Result,
    TickContext,
};
use serde_json::{json, Value};

use super::remember;

/// Text label
///
/// A string message, or an object message with a string `text` field,
/// replaces the `text` prop. Other messages are only remembered in `last`.
///
/// # Props
/// - `topic` - broker topic to listen on besides wired routes
pub struct TextNode {
    topic: Option<String>,
    subscribed: bool,
}

impl TextNode {
    pub const KIND: &'static str = "display::text";

    fn create(spec: &NodeSpec, _parent: Option<&Node>) -> Result<Box<dyn Behavior>> {
        Ok(Box::new(Self {
            topic: spec.prop("topic").and_then(Value::as_str).map(str::to_string),
            subscribed: false,
        }))
    }
}

fn text_of(message: &Value) -> Option<&str> {
    match message {
        Value::String(text) => Some(text.as_str()),
        Value::Object(fields) => fields.get("text").and_then(Value::as_str),
        _ => None,
    }
}

impl KindDescriptor for TextNode {
    fn descriptor() -> KindMetadata {
        KindMetadata::new(Self::KIND, KindCategory::Display, "Text")
            .with_description("Label showing the latest text it was sent")
    }
}

inventory::submit!(KindRegistration::new(TextNode::descriptor, TextNode::create));

#[async_trait]
impl Behavior for TextNode {
    async fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<()> {
        if !self.subscribed {
            if let Some(topic) = &self.topic {
                ctx.subscribe(topic.as_str());
            }
            self.subscribed = true;
        }
        for message in ctx.take_inbox() {
            if let Some(text) = text_of(&message) {
                ctx.set_prop("text", json!(text));
            }
            remember(ctx, &message);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_of_message_shapes() {
        assert_eq!(text_of(&json!("hello")), Some("hello"));
        assert_eq!(text_of(&json!({ "event": "press", "text": "go" })), Some("go"));
        assert_eq!(text_of(&json!({ "event": "collide" })), None);
        assert_eq!(text_of(&json!(42)), None);
    }
}
