//! Engine-level errors.

use illusionary_ecs::EcsError;

/// Errors produced by the engine layer.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Ecs(#[from] EcsError),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration parsed but holds unusable values.
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),

    #[error("failed to install tracing subscriber: {0}")]
    LoggingInit(#[from] tracing_subscriber::util::TryInitError),
}
