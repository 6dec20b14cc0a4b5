//! Small behaviors shared by the engine's unit tests

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::behavior::{Behavior, TickContext};
use crate::descriptor::{CreateFn, KindCategory, KindMetadata};
use crate::error::{Result, SceneError};
use crate::node::Node;
use crate::registry::KindRegistry;
use crate::types::NodeSpec;

/// Does nothing
pub struct Idle;

#[async_trait]
impl Behavior for Idle {
    async fn update(&mut self, _ctx: &mut TickContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Publishes `frame#<n>` every tick
#[derive(Default)]
pub struct Emitter {
    frames: u64,
}

#[async_trait]
impl Behavior for Emitter {
    async fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<()> {
        self.frames += 1;
        ctx.publish(format!("frame#{}", self.frames));
        Ok(())
    }
}

/// Appends every delivered message to its `received` prop
pub struct Recorder;

#[async_trait]
impl Behavior for Recorder {
    async fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<()> {
        let inbox = ctx.take_inbox();
        ctx.node().update_props(|props| {
            let received = props.entry("received").or_insert_with(|| json!([]));
            if let Value::Array(list) = received {
                list.extend(inbox);
            }
        });
        Ok(())
    }
}

/// Increments its `value` prop every tick
pub struct Counter;

#[async_trait]
impl Behavior for Counter {
    async fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<()> {
        let value = ctx.node().prop_f64("value", 0.0);
        ctx.set_prop("value", json!(value + 1.0));
        Ok(())
    }
}

/// Copies its host's `value` prop into the host's `observed` prop.
///
/// Also records the host's `value` seen at construction as its own `initial` prop.
pub struct Observer {
    initial: Value,
}

#[async_trait]
impl Behavior for Observer {
    async fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<()> {
        let parent = ctx
            .parent()
            .ok_or_else(|| SceneError::behavior("observer has no host"))?;
        let value = parent.prop("value").unwrap_or(Value::Null);
        parent.set_prop("observed", value);
        ctx.set_prop("initial", self.initial.clone());
        Ok(())
    }
}

/// Always fails
pub struct Failing;

#[async_trait]
impl Behavior for Failing {
    async fn update(&mut self, _ctx: &mut TickContext<'_>) -> Result<()> {
        Err(SceneError::behavior("deliberate failure"))
    }
}

fn meta(kind: &str, category: KindCategory) -> KindMetadata {
    KindMetadata::new(kind, category, kind)
}

fn idle(_spec: &NodeSpec, _parent: Option<&Node>) -> Result<Box<dyn Behavior>> {
    Ok(Box::new(Idle))
}

fn emitter(_spec: &NodeSpec, _parent: Option<&Node>) -> Result<Box<dyn Behavior>> {
    Ok(Box::new(Emitter::default()))
}

fn recorder(_spec: &NodeSpec, _parent: Option<&Node>) -> Result<Box<dyn Behavior>> {
    Ok(Box::new(Recorder))
}

fn counter(_spec: &NodeSpec, _parent: Option<&Node>) -> Result<Box<dyn Behavior>> {
    Ok(Box::new(Counter))
}

fn failing(_spec: &NodeSpec, _parent: Option<&Node>) -> Result<Box<dyn Behavior>> {
    Ok(Box::new(Failing))
}

fn observer(_spec: &NodeSpec, parent: Option<&Node>) -> Result<Box<dyn Behavior>> {
    let initial = parent.and_then(|p| p.prop("value")).unwrap_or(Value::Null);
    Ok(Box::new(Observer { initial }))
}

/// Registry with every test behavior
pub fn registry() -> KindRegistry {
    let kinds: [(KindMetadata, CreateFn); 8] = [
        (meta("test/idle", KindCategory::Mesh), idle),
        (meta("test/emitter", KindCategory::Capture), emitter),
        (meta("test/recorder", KindCategory::Vision), recorder),
        (meta("test/counter", KindCategory::Mesh), counter),
        (meta("test/fail", KindCategory::Mesh), failing),
        (meta("test/behavior/observer", KindCategory::Effect), observer),
        (meta("cam::singleton", KindCategory::Capture).singleton(), emitter),
        (meta("seg::singleton", KindCategory::Vision).singleton(), recorder),
    ];
    let mut registry = KindRegistry::new();
    for (metadata, create) in kinds {
        registry
            .register_fn(metadata, create)
            .expect("test kinds are distinct");
    }
    registry
}
