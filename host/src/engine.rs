//! Simulated host engine
//!
//! Stands on the far side of the host bridge in place of a real renderer.
//! It answers the readiness handshake, hands out entity handles for
//! `create` requests and logs everything it is asked to do.

use scene_engine::{ops, HostEndpoint};
use tokio::task::JoinHandle;

/// Reply to a successful `bootstrap`
pub const READY: &str = "ready";

/// Reply to an operation the engine does not know
pub const UNSUPPORTED: &str = "unsupported";

/// Bookkeeping of what the engine was asked to do
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EngineStats {
    pub requests: u64,
    pub created: Vec<String>,
}

impl EngineStats {
    fn handle(&mut self, operation: &str, payload: &str) -> String {
        self.requests += 1;
        match operation {
            ops::BOOTSTRAP => READY.to_string(),
            ops::CREATE => {
                let handle = format!("entity:{}#{}", payload, self.created.len() + 1);
                self.created.push(handle.clone());
                handle
            }
            other => {
                log::warn!("Engine: unsupported operation '{}'", other);
                UNSUPPORTED.to_string()
            }
        }
    }
}

/// Serve requests until every bridge holding the other end is dropped
pub fn spawn(mut endpoint: HostEndpoint) -> JoinHandle<EngineStats> {
    tokio::spawn(async move {
        let mut stats = EngineStats::default();
        while let Some(request) = endpoint.recv().await {
            log::info!(
                "Engine <- {} from {}: {:?}",
                request.operation,
                request.caller,
                request.payload
            );
            let reply = stats.handle(&request.operation, &request.payload);
            if !request.respond(reply) {
                log::debug!("Engine: caller went away before the reply");
            }
        }
        log::info!(
            "Engine stopped after {} requests, {} entities",
            stats.requests,
            stats.created.len()
        );
        stats
    })
}
