//! Per-kind behavior trait and the context handed to it each tick

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::bridge::HostBridge;
use crate::error::{Result, SceneError};
use crate::node::Node;
use crate::types::{Message, NodeId};

/// Runtime behavior of one node kind
///
/// A behavior instance is created once per node at build time by the kind's
/// factory. The scheduler calls [`Behavior::update`] once per tick, after the
/// node's queued broker messages have been moved into the context inbox.
#[async_trait]
pub trait Behavior: Send {
    /// Advance this node by one tick
    async fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<()>;
}

/// A topic operation requested during an update, applied by the scheduler
#[derive(Debug, Clone, PartialEq)]
pub enum TopicRequest {
    Subscribe(String),
    Unsubscribe(String),
    Publish(String, Message),
}

/// Everything a behavior can see and do during one update
pub struct TickContext<'a> {
    node: &'a Arc<Node>,
    parent: Option<Arc<Node>>,
    inbox: Vec<Message>,
    published: Vec<Message>,
    topics: Vec<TopicRequest>,
    bridge: Option<&'a HostBridge>,
    tick: u64,
    delta: f64,
}

impl<'a> TickContext<'a> {
    /// Create a context for one update of `node`
    pub fn new(node: &'a Arc<Node>, tick: u64, delta: f64) -> Self {
        Self {
            node,
            parent: node.parent(),
            inbox: Vec::new(),
            published: Vec::new(),
            topics: Vec::new(),
            bridge: None,
            tick,
            delta,
        }
    }

    /// Attach the messages drained for this node
    pub fn with_inbox(mut self, inbox: Vec<Message>) -> Self {
        self.inbox = inbox;
        self
    }

    /// Attach the host bridge
    pub fn with_bridge(mut self, bridge: &'a HostBridge) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// The node being updated
    pub fn node(&self) -> &Arc<Node> {
        self.node
    }

    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    /// Host node, for effects
    pub fn parent(&self) -> Option<&Arc<Node>> {
        self.parent.as_ref()
    }

    /// Current tick number, starting at 1
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Fixed step in seconds
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Messages delivered to this node this tick
    pub fn inbox(&self) -> &[Message] {
        &self.inbox
    }

    /// Take the delivered messages, leaving the inbox empty
    pub fn take_inbox(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.inbox)
    }

    /// Queue a message on this node's outgoing routes.
    ///
    /// The scheduler forwards it to the broker as soon as the update returns.
    pub fn publish(&mut self, message: impl Into<Message>) {
        self.published.push(message.into());
    }

    /// Messages published so far during this update
    pub fn published(&self) -> &[Message] {
        &self.published
    }

    /// Start receiving messages published on `topic` from the next update on
    pub fn subscribe(&mut self, topic: impl Into<String>) {
        self.topics.push(TopicRequest::Subscribe(topic.into()));
    }

    pub fn unsubscribe(&mut self, topic: impl Into<String>) {
        self.topics.push(TopicRequest::Unsubscribe(topic.into()));
    }

    /// Queue a message for every subscriber of `topic`
    pub fn publish_topic(&mut self, topic: impl Into<String>, message: impl Into<Message>) {
        self.topics
            .push(TopicRequest::Publish(topic.into(), message.into()));
    }

    /// Topic operations requested so far during this update
    pub fn topic_requests(&self) -> &[TopicRequest] {
        &self.topics
    }

    pub(crate) fn into_outgoing(self) -> (Vec<Message>, Vec<TopicRequest>) {
        (self.published, self.topics)
    }

    /// Read a property of this node
    pub fn prop(&self, key: &str) -> Option<Value> {
        self.node.prop(key)
    }

    /// Write a property of this node
    pub fn set_prop(&self, key: impl Into<String>, value: Value) {
        self.node.set_prop(key, value);
    }

    /// Whether a host bridge is attached
    pub fn has_host(&self) -> bool {
        self.bridge.is_some()
    }

    /// Forward an operation to the external engine on behalf of this node
    pub async fn host(&self, operation: &str, payload: &str) -> Result<String> {
        match self.bridge {
            Some(bridge) => bridge.send(self.node.id(), operation, payload).await,
            None => Err(SceneError::BridgeUnavailable(
                "no host bridge attached to this tree".to_string(),
            )),
        }
    }
}
