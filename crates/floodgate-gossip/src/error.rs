//! Error types for floodgate-gossip

use floodgate_core::{EngineError, Topic};
use thiserror::Error;

/// Errors that can occur in the gossip layer
#[derive(Debug, Error)]
pub enum GossipError {
    /// Failed to join a gossip topic
    #[error("failed to join gossip topic: {0}")]
    SubscribeFailed(String),

    /// Failed to broadcast message
    #[error("failed to broadcast message: {0}")]
    BroadcastFailed(String),

    /// Failed to encode message
    #[error("failed to encode message: {0}")]
    EncodeFailed(String),

    /// Failed to decode message
    #[error("failed to decode message: {0}")]
    DecodeFailed(String),

    /// Signature verification failed
    #[error("signature verification failed: {0}")]
    SignatureVerificationFailed(String),

    /// Engine is not started
    #[error("gossip engine not started")]
    NotStarted,
}

impl GossipError {
    /// Convert into the engine error for an operation on a topic
    pub fn for_topic(self, topic: &Topic) -> EngineError {
        match self {
            GossipError::NotStarted => EngineError::NotStarted,
            GossipError::SubscribeFailed(reason) => EngineError::SubscribeFailed {
                topic: topic.clone(),
                reason,
            },
            GossipError::BroadcastFailed(reason) | GossipError::EncodeFailed(reason) => {
                EngineError::PublishFailed {
                    topic: topic.clone(),
                    reason,
                }
            }
            other => EngineError::Other(other.to_string()),
        }
    }
}

impl From<postcard::Error> for GossipError {
    fn from(e: postcard::Error) -> Self {
        GossipError::EncodeFailed(e.to_string())
    }
}

impl From<GossipError> for EngineError {
    fn from(e: GossipError) -> Self {
        match e {
            GossipError::NotStarted => EngineError::NotStarted,
            other => EngineError::Other(other.to_string()),
        }
    }
}

/// Result type for gossip operations
pub type GossipResult<T> = Result<T, GossipError>;
