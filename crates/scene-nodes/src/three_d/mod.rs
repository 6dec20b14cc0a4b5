//! 3d kinds
//!
//! Lights and meshes live in the host engine's scene; the rotate and collide
//! effects move them by editing their host's `xyz`, `velocity` and
//! `rotation` props.

mod collide;
mod light;
mod mesh;
mod rotate;

pub use collide::CollideEffect;
pub use light::LightNode;
pub use mesh::MeshNode;
pub use rotate::RotateEffect;
