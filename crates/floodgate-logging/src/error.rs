//! Error types for logging setup

use thiserror::Error;

/// Errors raised while installing the global subscriber
#[derive(Debug, Error)]
pub enum LogError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(#[from] tracing_subscriber::filter::ParseError),

    #[error("Failed to create log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to create rolling log appender: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// Result type for logging setup
pub type LogResult<T> = Result<T, LogError>;
