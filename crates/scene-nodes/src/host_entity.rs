//! Entities mirrored in the external engine
//!
//! Kinds that have a visible counterpart (lights, meshes, the camera) ask the
//! engine to create it on their first tick with a host bridge attached. The
//! returned handle is kept in the node's `entity` prop.

use scene_engine::{ops, Result, TickContext};
use serde_json::json;

/// Create requests tried before a node gives up on its entity
pub const MAX_CREATE_ATTEMPTS: u32 = 3;

/// Prop holding the engine's handle for a node's entity
pub const ENTITY_PROP: &str = "entity";

#[derive(Debug, Clone, PartialEq, Eq)]
enum EntityState {
    Pending { attempts: u32 },
    Created(String),
    Abandoned,
}

/// Lazily created entity in the external engine
#[derive(Debug, Clone)]
pub struct HostEntity {
    descriptor: String,
    state: EntityState,
}

impl HostEntity {
    /// `descriptor` is the `create` payload, e.g. `cube` or `anselm2.glb`
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.into(),
            state: EntityState::Pending { attempts: 0 },
        }
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Engine handle, once created
    pub fn handle(&self) -> Option<&str> {
        match &self.state {
            EntityState::Created(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn is_abandoned(&self) -> bool {
        self.state == EntityState::Abandoned
    }

    /// Create the entity if it does not exist yet.
    ///
    /// Does nothing without a host bridge. A failed request is returned as
    /// this tick's error and retried next tick, up to [`MAX_CREATE_ATTEMPTS`].
    pub async fn ensure(&mut self, ctx: &mut TickContext<'_>) -> Result<()> {
        let EntityState::Pending { attempts } = self.state else {
            return Ok(());
        };
        if !ctx.has_host() {
            return Ok(());
        }

        match ctx.host(ops::CREATE, &self.descriptor).await {
            Ok(handle) => {
                log::info!("{} '{}' created entity {}", ctx.id(), ctx.node().name(), handle);
                ctx.set_prop(ENTITY_PROP, json!(handle));
                self.state = EntityState::Created(handle);
                Ok(())
            }
            Err(e) => {
                let attempts = attempts + 1;
                if attempts >= MAX_CREATE_ATTEMPTS {
                    log::warn!(
                        "{} '{}' gave up creating '{}' after {} attempts",
                        ctx.id(),
                        ctx.node().name(),
                        self.descriptor,
                        attempts
                    );
                    self.state = EntityState::Abandoned;
                } else {
                    self.state = EntityState::Pending { attempts };
                }
                Err(e)
            }
        }
    }
}
