//! Tick scheduler
//!
//! One tick visits every distinct node of a tree in traversal order: each
//! node, then its effects, then its children. For each node the scheduler
//! drains the node's broker channel into its context, runs the behavior's
//! update, and forwards the update's publishes to the broker before moving
//! on. A downstream node later in the order therefore sees a message on the
//! same tick; one earlier in the order sees it on the next. Topic requests
//! made during an update are applied right after its wired publishes.
//!
//! The scheduler keeps no per-tree state. The traversal plan is derived from
//! the tree on every tick.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::behavior::{TickContext, TopicRequest};
use crate::error::SceneError;
use crate::events::{emit, EventSink, NullEventSink, SceneEvent};
use crate::node::Node;
use crate::tree::SceneTree;
use crate::types::NodeId;

/// Default tick period (about 60 ticks per second)
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Visit order for one tick
#[derive(Debug, Clone)]
pub struct TraversalPlan {
    order: Vec<Arc<Node>>,
}

impl TraversalPlan {
    /// Derive the plan for the tree under `root`.
    ///
    /// A node reachable from several places (a shared singleton) is kept at
    /// its first position only.
    pub fn derive(root: &Arc<Node>) -> Self {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        Self::visit(root, &mut seen, &mut order);
        Self { order }
    }

    fn visit(node: &Arc<Node>, seen: &mut HashSet<NodeId>, order: &mut Vec<Arc<Node>>) {
        if !seen.insert(node.id()) {
            return;
        }
        order.push(node.clone());
        for attached in node.effects().iter().chain(node.children()) {
            Self::visit(attached.node(), seen, order);
        }
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.order
    }

    pub fn into_nodes(self) -> Vec<Arc<Node>> {
        self.order
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.order.iter().map(|node| node.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// A node whose update failed during a tick
#[derive(Debug)]
pub struct NodeFailure {
    pub node: NodeId,
    pub name: String,
    pub kind: String,
    pub error: SceneError,
}

/// Outcome of one tick
#[derive(Debug, Default)]
pub struct TickReport {
    pub tick: u64,
    /// Nodes whose update returned successfully
    pub updated: usize,
    /// Messages drained into inboxes
    pub delivered: usize,
    /// Messages handed to the broker
    pub published: usize,
    pub failures: Vec<NodeFailure>,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives ticks over a tree
pub struct Scheduler {
    tick_interval: Duration,
    events: Arc<dyn EventSink>,
}

impl Scheduler {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            tick_interval: tick_interval.max(Duration::from_millis(1)),
            events: Arc::new(NullEventSink),
        }
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Fixed step handed to every update, in seconds
    pub fn delta(&self) -> f64 {
        self.tick_interval.as_secs_f64()
    }

    /// Run one tick over every node of `tree`
    pub async fn tick(&self, tree: &mut SceneTree) -> TickReport {
        let tick = tree.advance_tick();
        let plan = TraversalPlan::derive(tree.root());
        let bridge = tree.bridge().cloned();
        let delta = self.delta();
        let mut report = TickReport {
            tick,
            ..TickReport::default()
        };

        for node in plan.nodes() {
            let inbox = tree.broker_mut().drain(node.id());
            report.delivered += inbox.len();

            let mut ctx = TickContext::new(node, tick, delta).with_inbox(inbox);
            if let Some(bridge) = bridge.as_deref() {
                ctx = ctx.with_bridge(bridge);
            }
            let outcome = {
                let mut behavior = node.behavior().lock().await;
                behavior.update(&mut ctx).await
            };

            let (published, topics) = ctx.into_outgoing();
            for message in published {
                tree.broker_mut().publish(node.id(), message);
                report.published += 1;
            }
            for request in topics {
                match request {
                    TopicRequest::Subscribe(topic) => {
                        tree.broker_mut().subscribe(&topic, node.id());
                    }
                    TopicRequest::Unsubscribe(topic) => {
                        tree.broker_mut().unsubscribe(&topic, node.id());
                    }
                    TopicRequest::Publish(topic, message) => {
                        tree.broker_mut().publish_topic(&topic, message);
                        report.published += 1;
                    }
                }
            }

            match outcome {
                Ok(()) => report.updated += 1,
                Err(error) => {
                    log::warn!(
                        "Tick {}: {} '{}' ({}) failed: {}",
                        tick,
                        node.id(),
                        node.name(),
                        node.kind(),
                        error
                    );
                    emit(
                        self.events.as_ref(),
                        SceneEvent::node_failed(
                            &tree.id().to_string(),
                            tick,
                            &node.id().to_string(),
                            node.kind(),
                            &error.to_string(),
                        ),
                    );
                    report.failures.push(NodeFailure {
                        node: node.id(),
                        name: node.name().to_string(),
                        kind: node.kind().to_string(),
                        error,
                    });
                }
            }
        }

        emit(
            self.events.as_ref(),
            SceneEvent::TickCompleted {
                tree_id: tree.id().to_string(),
                tick,
                updated: report.updated,
                failed: report.failures.len(),
            },
        );
        log::trace!(
            "Tick {} done: {} updated, {} delivered, {} published",
            tick,
            report.updated,
            report.delivered,
            report.published
        );
        report
    }

    /// Tick `tree` on a fixed interval.
    ///
    /// Stops after `limit` ticks, or runs until the future is dropped when
    /// `limit` is `None`. Returns the number of ticks run.
    pub async fn run(&self, tree: &mut SceneTree, limit: Option<u64>) -> u64 {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ran = 0;
        while limit.map_or(true, |limit| ran < limit) {
            interval.tick().await;
            let report = self.tick(tree).await;
            if !report.is_clean() {
                log::debug!("Tick {} had {} failure(s)", report.tick, report.failures.len());
            }
            ran += 1;
        }
        ran
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{ops, HostBridge};
    use crate::builder::TreeBuilder;
    use crate::events::VecEventSink;
    use crate::test_support;
    use crate::types::NodeSpec;
    use serde_json::json;

    fn builder() -> TreeBuilder {
        TreeBuilder::new(Arc::new(test_support::registry()))
    }

    fn received(tree: &SceneTree, path: &str) -> serde_json::Value {
        tree.find(path).unwrap().prop("received").unwrap_or(json!([]))
    }

    #[test]
    fn test_plan_runs_effects_before_children() {
        let spec = NodeSpec::system("root").with_child(
            NodeSpec::new("earth", "test/counter")
                .with_child(NodeSpec::new("moon", "test/idle"))
                .with_child(NodeSpec::new("spin", "test/behavior/observer")),
        );
        let tree = builder().build(&spec).unwrap();

        let names: Vec<String> = TraversalPlan::derive(tree.root())
            .nodes()
            .iter()
            .map(|node| node.name().to_string())
            .collect();
        assert_eq!(names, vec!["root", "earth", "spin", "moon"]);
    }

    #[tokio::test]
    async fn test_camera_frame_reaches_segmenter() {
        let spec = NodeSpec::system("root").with_child(
            NodeSpec::system("app")
                .with_child(NodeSpec::new("camera", "cam::singleton"))
                .with_child(NodeSpec::new("segmenter", "seg::singleton"))
                .with_route("camera -> segmenter"),
        );
        let mut tree = builder().build(&spec).unwrap();
        let scheduler = Scheduler::default();

        let report = scheduler.tick(&mut tree).await;
        assert!(report.is_clean());
        // The segmenter comes after the camera, so it sees the frame this tick.
        assert_eq!(received(&tree, "app.segmenter"), json!(["frame#1"]));
        assert_eq!(report.delivered, 1);

        scheduler.tick(&mut tree).await;
        assert_eq!(received(&tree, "app.segmenter"), json!(["frame#1", "frame#2"]));
    }

    #[tokio::test]
    async fn test_earlier_sink_sees_message_next_tick() {
        let spec = NodeSpec::system("root")
            .with_child(NodeSpec::new("sink", "test/recorder"))
            .with_child(NodeSpec::new("source", "test/emitter"))
            .with_route("source -> sink");
        let mut tree = builder().build(&spec).unwrap();
        let scheduler = Scheduler::default();

        scheduler.tick(&mut tree).await;
        assert_eq!(received(&tree, "sink"), json!([]));
        assert_eq!(tree.broker().pending(tree.find("sink").unwrap().id()), 1);

        scheduler.tick(&mut tree).await;
        assert_eq!(received(&tree, "sink"), json!(["frame#1"]));
    }

    #[tokio::test]
    async fn test_effect_observes_same_tick_state() {
        let spec = NodeSpec::system("root").with_child(
            NodeSpec::new("earth", "test/counter")
                .with_prop("value", json!(10))
                .with_child(NodeSpec::new("observer", "test/behavior/observer")),
        );
        let mut tree = builder().build(&spec).unwrap();
        Scheduler::default().tick(&mut tree).await;

        let earth = tree.find("earth").unwrap();
        assert_eq!(earth.prop("value"), Some(json!(11.0)));
        assert_eq!(earth.prop("observed"), Some(json!(11.0)));
        assert_eq!(tree.find("earth.observer").unwrap().prop("initial"), Some(json!(10)));
    }

    #[tokio::test]
    async fn test_failure_is_local_to_node() {
        let spec = NodeSpec::system("root")
            .with_child(NodeSpec::new("broken", "test/fail"))
            .with_child(NodeSpec::new("counter", "test/counter"));
        let sink = Arc::new(VecEventSink::new());
        let mut tree = builder().build(&spec).unwrap();
        let scheduler = Scheduler::default().with_event_sink(sink.clone());

        let report = scheduler.tick(&mut tree).await;
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].name, "broken");
        assert!(matches!(report.failures[0].error, SceneError::Behavior(_)));
        assert_eq!(report.updated, 2);
        assert_eq!(tree.find("counter").unwrap().prop("value"), Some(json!(1.0)));

        let events = sink.events();
        assert!(matches!(&events[0], SceneEvent::NodeFailed { kind, .. } if kind == "test/fail"));
        assert!(matches!(&events[1], SceneEvent::TickCompleted { tick: 1, failed: 1, .. }));
    }

    #[tokio::test]
    async fn test_shared_singleton_updates_once_per_tick() {
        let spec = NodeSpec::system("root")
            .with_child(NodeSpec::system("left").with_child(NodeSpec::new("cam", "cam::singleton")))
            .with_child(NodeSpec::system("right").with_child(NodeSpec::new("cam", "cam::singleton")))
            .with_child(NodeSpec::new("sink", "test/recorder"))
            .with_route("left.cam -> sink");
        let mut tree = builder().build(&spec).unwrap();

        let report = Scheduler::default().tick(&mut tree).await;
        assert_eq!(report.updated, 5);
        assert_eq!(report.published, 1);
        assert_eq!(received(&tree, "sink"), json!(["frame#1"]));
    }

    #[tokio::test]
    async fn test_run_stops_after_limit() {
        let spec = NodeSpec::system("root").with_child(NodeSpec::new("counter", "test/counter"));
        let mut tree = builder().build(&spec).unwrap();

        let ran = Scheduler::new(Duration::from_millis(1)).run(&mut tree, Some(3)).await;
        assert_eq!(ran, 3);
        assert_eq!(tree.ticks(), 3);
        assert_eq!(tree.find("counter").unwrap().prop("value"), Some(json!(3.0)));
    }

    #[tokio::test]
    async fn test_bridge_available_to_updates() {
        use crate::behavior::Behavior;
        use crate::descriptor::{KindCategory, KindMetadata};
        use crate::error::Result;
        use async_trait::async_trait;

        struct Creator;

        #[async_trait]
        impl Behavior for Creator {
            async fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<()> {
                let handle = ctx.host(ops::CREATE, "cube").await?;
                ctx.set_prop("entity", json!(handle));
                Ok(())
            }
        }

        let mut registry = test_support::registry();
        registry
            .register_fn(
                KindMetadata::new("test/creator", KindCategory::Mesh, "Creator"),
                |_spec: &NodeSpec, _parent: Option<&Node>| -> Result<Box<dyn Behavior>> {
                    Ok(Box::new(Creator))
                },
            )
            .unwrap();

        let (bridge, mut endpoint) = HostBridge::channel(4, Duration::from_secs(1));
        tokio::spawn(async move {
            while let Some(request) = endpoint.recv().await {
                let reply = format!("entity:{}", request.payload);
                request.respond(reply);
            }
        });

        let spec = NodeSpec::system("root").with_child(NodeSpec::new("mesh", "test/creator"));
        let mut tree = TreeBuilder::new(Arc::new(registry))
            .with_bridge(Arc::new(bridge))
            .build(&spec)
            .unwrap();
        let report = Scheduler::default().tick(&mut tree).await;

        assert!(report.is_clean());
        assert_eq!(tree.find("mesh").unwrap().prop("entity"), Some(json!("entity:cube")));
    }

    #[tokio::test]
    async fn test_topic_requests_applied_after_update() {
        use crate::behavior::Behavior;
        use crate::descriptor::{KindCategory, KindMetadata};
        use crate::error::Result;
        use async_trait::async_trait;

        /// Listens on `/display` for two ticks, recording what arrives
        struct Listener;

        #[async_trait]
        impl Behavior for Listener {
            async fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<()> {
                match ctx.tick() {
                    1 => ctx.subscribe("/display"),
                    3 => ctx.unsubscribe("/display"),
                    _ => {}
                }
                let inbox = ctx.take_inbox();
                ctx.node().update_props(|props| {
                    if let Some(serde_json::Value::Array(list)) = props.get_mut("received") {
                        list.extend(inbox);
                    }
                });
                Ok(())
            }
        }

        struct Broadcaster;

        #[async_trait]
        impl Behavior for Broadcaster {
            async fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<()> {
                let frame = format!("frame#{}", ctx.tick());
                ctx.publish_topic("/display", frame);
                assert_eq!(ctx.topic_requests().len(), 1);
                Ok(())
            }
        }

        let mut registry = test_support::registry();
        registry
            .register_fn(
                KindMetadata::new("test/listener", KindCategory::Display, "Listener"),
                |_spec: &NodeSpec, _parent: Option<&Node>| -> Result<Box<dyn Behavior>> {
                    Ok(Box::new(Listener))
                },
            )
            .unwrap();
        registry
            .register_fn(
                KindMetadata::new("test/broadcaster", KindCategory::Capture, "Broadcaster"),
                |_spec: &NodeSpec, _parent: Option<&Node>| -> Result<Box<dyn Behavior>> {
                    Ok(Box::new(Broadcaster))
                },
            )
            .unwrap();

        let spec = NodeSpec::system("root")
            .with_child(NodeSpec::new("listener", "test/listener").with_prop("received", json!([])))
            .with_child(NodeSpec::new("broadcaster", "test/broadcaster"));
        let mut tree = TreeBuilder::new(Arc::new(registry)).build(&spec).unwrap();
        let scheduler = Scheduler::default();

        let report = scheduler.tick(&mut tree).await;
        assert_eq!(report.published, 1);
        let listener = tree.find("listener").unwrap().id();
        assert_eq!(tree.broker().subscribers("/display"), &[listener]);

        for _ in 0..3 {
            scheduler.tick(&mut tree).await;
        }
        assert!(tree.broker().subscribers("/display").is_empty());
        assert_eq!(received(&tree, "listener"), json!(["frame#1", "frame#2"]));
    }

    #[tokio::test]
    async fn test_missing_bridge_is_local_failure() {
        let spec = NodeSpec::system("root").with_child(NodeSpec::new("counter", "test/counter"));
        let tree = builder().build(&spec).unwrap();
        let node = tree.find("counter").unwrap();
        let ctx = TickContext::new(&node, 1, 0.016);

        let err = ctx.host(ops::CREATE, "cube").await.unwrap_err();
        assert!(err.is_bridge_error());
    }
}
