//! Error types for the node

use thiserror::Error;

/// Errors that can occur in the node
#[derive(Debug, Error)]
pub enum NodeError {
    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Node already started
    #[error("Node already started")]
    AlreadyStarted,

    /// Node was stopped and its endpoint closed
    #[error("Node endpoint is closed")]
    Closed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Logging setup error
    #[error("Logging error: {0}")]
    Logging(#[from] floodgate_logging::LogError),
}

impl From<toml::de::Error> for NodeError {
    fn from(e: toml::de::Error) -> Self {
        NodeError::Config(e.to_string())
    }
}

/// Result type alias for node operations
pub type NodeResult<T> = Result<T, NodeError>;
