//! Wire broker: named routes between nodes and per-sink message channels
//!
//! Wires are declared as `"source -> sink"` strings and resolved once,
//! against an already-built tree, into node identities. After that the broker
//! only deals in [`NodeId`]s.
//!
//! Each sink owns one bounded FIFO channel. Messages published by a source are
//! copied into the channel of every sink it is routed to and stay there until
//! the sink's next [`Broker::drain`]. When a channel is full the configured
//! [`OverflowPolicy`] decides which message is lost.
//!
//! Nodes may also subscribe to named topics. A message published on a topic
//! is queued, unchanged, in the channel of every current subscriber, so a
//! sink sees wired and topic messages interleaved in arrival order.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError};
use crate::node::Node;
use crate::types::{Message, NodeId};

/// Route arrow separating source and sink paths
pub const ROUTE_ARROW: &str = "->";

/// Default number of pending messages per sink
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// What happens when a sink's channel is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest pending message to make room
    #[default]
    DropOldest,
    /// Keep the pending messages and discard the new one
    RejectNew,
}

/// Channel sizing for a broker
///
/// A capacity below 1 is raised to 1 when the broker is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerConfig {
    pub capacity: usize,
    pub overflow: OverflowPolicy,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CHANNEL_CAPACITY,
            overflow: OverflowPolicy::default(),
        }
    }
}

/// A resolved wire between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub source: NodeId,
    pub sink: NodeId,
    pub source_path: String,
    pub sink_path: String,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.source_path, ROUTE_ARROW, self.sink_path)
    }
}

/// Split a route string into its trimmed source and sink paths
pub fn parse_route(spec: &str) -> Result<(&str, &str)> {
    let invalid = || SceneError::InvalidRoute(spec.to_string());
    let (source, sink) = spec.split_once(ROUTE_ARROW).ok_or_else(invalid)?;
    let (source, sink) = (source.trim(), sink.trim());
    if source.is_empty() || sink.is_empty() || sink.contains(ROUTE_ARROW) {
        return Err(invalid());
    }
    Ok((source, sink))
}

/// Resolve a `.` or `/` separated path of declared names, starting at `scope`
pub fn resolve_path(scope: &Arc<Node>, path: &str) -> Option<Arc<Node>> {
    let mut current = scope.clone();
    let mut segments = path
        .split(|c| c == '.' || c == '/')
        .filter(|segment| !segment.is_empty())
        .peekable();
    segments.peek()?;
    for segment in segments {
        let next = current.child(segment)?.clone();
        current = next;
    }
    Some(current)
}

/// Publish/subscribe layer for one tree
#[derive(Debug, Default)]
pub struct Broker {
    config: BrokerConfig,
    routes: Vec<Route>,
    fanout: HashMap<NodeId, Vec<NodeId>>,
    topics: HashMap<String, Vec<NodeId>>,
    channels: HashMap<NodeId, VecDeque<Message>>,
    dropped: u64,
}

impl Broker {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config: BrokerConfig {
                capacity: config.capacity.max(1),
                ..config
            },
            ..Self::default()
        }
    }

    pub fn config(&self) -> BrokerConfig {
        self.config
    }

    /// Parse, resolve, and register a wire declared in `scope`.
    ///
    /// Nothing is registered unless every check passes.
    pub fn register_route(&mut self, spec: &str, scope: &Arc<Node>) -> Result<Route> {
        let (source_path, sink_path) = parse_route(spec)?;
        let unresolved = |path: &str| SceneError::UnresolvedEndpoint {
            route: spec.to_string(),
            path: path.to_string(),
        };
        let source = resolve_path(scope, source_path).ok_or_else(|| unresolved(source_path))?;
        let sink = resolve_path(scope, sink_path).ok_or_else(|| unresolved(sink_path))?;

        if source.id() == sink.id() {
            return Err(SceneError::CyclicRoute(spec.to_string()));
        }
        if self
            .fanout
            .get(&source.id())
            .is_some_and(|sinks| sinks.contains(&sink.id()))
        {
            return Err(SceneError::DuplicateRoute(spec.to_string()));
        }

        let route = Route {
            source: source.id(),
            sink: sink.id(),
            source_path: source_path.to_string(),
            sink_path: sink_path.to_string(),
        };
        self.fanout.entry(route.source).or_default().push(route.sink);
        self.channels.entry(route.sink).or_default();
        self.routes.push(route.clone());
        log::debug!("Route registered: {} ({} -> {})", route, route.source, route.sink);
        Ok(route)
    }

    /// Queue `message` for every sink routed from `source`.
    ///
    /// Returns the number of channels that accepted it. A source without
    /// routes drops the message.
    pub fn publish(&mut self, source: NodeId, message: Message) -> usize {
        let Some(sinks) = self.fanout.get(&source) else {
            return 0;
        };
        let sinks = sinks.clone();
        self.enqueue_all(&sinks, &message)
    }

    /// Add `sink` to the subscribers of `topic`.
    ///
    /// Returns false if it was already subscribed.
    pub fn subscribe(&mut self, topic: &str, sink: NodeId) -> bool {
        let subscribers = self.topics.entry(topic.to_string()).or_default();
        if subscribers.contains(&sink) {
            return false;
        }
        subscribers.push(sink);
        self.channels.entry(sink).or_default();
        log::debug!("{} subscribed to topic '{}'", sink, topic);
        true
    }

    /// Remove `sink` from the subscribers of `topic`.
    ///
    /// Messages already queued for it stay queued. Returns false if it was
    /// not subscribed.
    pub fn unsubscribe(&mut self, topic: &str, sink: NodeId) -> bool {
        let Some(subscribers) = self.topics.get_mut(topic) else {
            return false;
        };
        let before = subscribers.len();
        subscribers.retain(|id| *id != sink);
        let removed = subscribers.len() < before;
        if subscribers.is_empty() {
            self.topics.remove(topic);
        }
        if removed {
            log::debug!("{} unsubscribed from topic '{}'", sink, topic);
        }
        removed
    }

    /// Queue `message` for every subscriber of `topic`.
    ///
    /// Returns the number of channels that accepted it. A topic without
    /// subscribers drops the message.
    pub fn publish_topic(&mut self, topic: &str, message: Message) -> usize {
        let Some(subscribers) = self.topics.get(topic) else {
            log::trace!("No subscribers for topic '{}'", topic);
            return 0;
        };
        let subscribers = subscribers.clone();
        self.enqueue_all(&subscribers, &message)
    }

    /// Current subscribers of `topic`, in subscription order
    pub fn subscribers(&self, topic: &str) -> &[NodeId] {
        self.topics.get(topic).map(Vec::as_slice).unwrap_or(&[])
    }

    fn enqueue_all(&mut self, sinks: &[NodeId], message: &Message) -> usize {
        sinks
            .iter()
            .filter(|sink| self.enqueue(**sink, message.clone()))
            .count()
    }

    /// Push onto one sink's channel, applying the overflow policy
    fn enqueue(&mut self, sink: NodeId, message: Message) -> bool {
        let channel = self.channels.entry(sink).or_default();
        if channel.len() >= self.config.capacity {
            self.dropped += 1;
            match self.config.overflow {
                OverflowPolicy::DropOldest => {
                    channel.pop_front();
                    log::warn!("Channel for {} full; dropped oldest message", sink);
                }
                OverflowPolicy::RejectNew => {
                    log::warn!("Channel for {} full; rejected new message", sink);
                    return false;
                }
            }
        }
        channel.push_back(message);
        true
    }

    /// Take every message queued for `sink`, oldest first
    pub fn drain(&mut self, sink: NodeId) -> Vec<Message> {
        self.channels
            .get_mut(&sink)
            .map(|channel| channel.drain(..).collect())
            .unwrap_or_default()
    }

    /// Number of messages waiting for `sink`
    pub fn pending(&self, sink: NodeId) -> usize {
        self.channels.get(&sink).map_or(0, VecDeque::len)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Routes leaving `source`
    pub fn routes_from(&self, source: NodeId) -> impl Iterator<Item = &Route> {
        self.routes.iter().filter(move |route| route.source == source)
    }

    /// Messages lost to overflow since the broker was created
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Discard all routes and subscriptions along with their channels
    pub fn clear(&mut self) {
        self.routes.clear();
        self.fanout.clear();
        self.topics.clear();
        self.channels.clear();
    }
}
