//! Error types for the subscription adapter

use floodgate_core::EngineError;
use thiserror::Error;

/// Errors delivered by [`PubSub`](crate::PubSub) operations
#[derive(Debug, Error)]
pub enum PubSubError {
    /// Neither the node nor the engine is started
    #[error("not started yet")]
    NotStarted,

    /// An argument was rejected before reaching the engine
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The engine failed; passed through unchanged
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Result type for adapter operations
pub type PubSubResult<T> = Result<T, PubSubError>;
