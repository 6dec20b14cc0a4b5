//! Host error type

use scene_engine::SceneError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Engine task failed: {0}")]
    Engine(#[from] tokio::task::JoinError),
}
