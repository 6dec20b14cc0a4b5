//! Scene Nodes
//!
//! Built-in kinds for the Orbital scene engine. Each kind registers itself
//! through `inventory`, so [`builtin_registry`] picks up everything linked in.
//!
//! # Categories
//!
//! - **Light / Mesh**: `3d/light`, `3d/mesh`, mirrored as host engine entities
//! - **Effect**: `3d/behavior/rotate`, `3d/behavior/collide`, acting on their parent
//! - **Display**: `display`, `display::box`, `display::text`, `display::button`
//! - **Capture / Vision**: the `webcam::singleton` and `segmenter::singleton` kinds

pub mod capture;
pub mod display;
pub mod host_entity;
pub mod three_d;
pub mod vec3;
pub mod vision;

#[cfg(test)]
mod testing;

pub use capture::WebcamNode;
pub use display::{BoxNode, ButtonNode, DisplayNode, TextNode};
pub use host_entity::HostEntity;
pub use three_d::{CollideEffect, LightNode, MeshNode, RotateEffect};
pub use vec3::{Axis, Vec3};
pub use vision::SegmenterNode;

use scene_engine::KindRegistry;

/// Registry holding `system` and every built-in kind
pub fn builtin_registry() -> scene_engine::Result<KindRegistry> {
    KindRegistry::with_builtins()
}
