//! Helpers shared by the kind tests

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use scene_engine::{HostBridge, HostEndpoint, NodeSpec, SceneTree, TreeBuilder};

use crate::builtin_registry;

pub fn builder() -> TreeBuilder {
    TreeBuilder::new(Arc::new(builtin_registry().unwrap()))
}

/// Build `spec` under a system root named `root`
pub fn build(spec: NodeSpec) -> SceneTree {
    builder().build(&NodeSpec::system("root").with_child(spec)).unwrap()
}

/// Requests seen by a test engine, as `"<operation>:<payload>"`
pub type Requests = Arc<Mutex<Vec<String>>>;

/// Answer every request with `entity:<payload>`, except payloads naming
/// `broken`, which are dropped unanswered
pub fn spawn_engine(mut endpoint: HostEndpoint) -> Requests {
    let requests: Requests = Arc::default();
    let seen = requests.clone();
    tokio::spawn(async move {
        while let Some(request) = endpoint.recv().await {
            seen.lock().push(format!("{}:{}", request.operation, request.payload));
            if request.payload.contains("broken") {
                continue;
            }
            let handle = format!("entity:{}", request.payload);
            request.respond(handle);
        }
    });
    requests
}

/// Build `spec` with a bridge to a test engine
pub fn build_with_engine(spec: NodeSpec) -> (SceneTree, Requests) {
    let (bridge, endpoint) = HostBridge::channel(16, Duration::from_secs(1));
    let requests = spawn_engine(endpoint);
    let tree = builder()
        .with_bridge(Arc::new(bridge))
        .build(&NodeSpec::system("root").with_child(spec))
        .unwrap();
    (tree, requests)
}
