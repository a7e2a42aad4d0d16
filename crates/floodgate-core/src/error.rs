//! Error types for pub/sub engines

use thiserror::Error;

use crate::topic::Topic;

/// Errors raised by a [`PubSubEngine`](crate::PubSubEngine) implementation
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine has not been started (or has been stopped)
    #[error("pub/sub engine not started")]
    NotStarted,

    /// Failed to announce interest in a topic
    #[error("failed to subscribe to topic {topic}: {reason}")]
    SubscribeFailed { topic: Topic, reason: String },

    /// Failed to retract interest in a topic
    #[error("failed to unsubscribe from topic {topic}: {reason}")]
    UnsubscribeFailed { topic: Topic, reason: String },

    /// Failed to publish a message
    #[error("failed to publish to topic {topic}: {reason}")]
    PublishFailed { topic: Topic, reason: String },

    /// Generic engine error
    #[error("engine error: {0}")]
    Other(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
