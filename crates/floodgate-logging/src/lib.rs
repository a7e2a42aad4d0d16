//! Console and JSONL file logging for Floodgate
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines on the console (default)
//! - **Pretty Output**: Human-readable console format for development
//! - **File Output**: JSONL files with daily/hourly rotation via tracing-appender
//! - **RUST_LOG**: Environment filter overrides the configured level
//!
//! # Quick Start
//!
//! ```ignore
//! use floodgate_logging::{FloodgateSubscriberBuilder, LogConfig};
//!
//! // Simple setup with defaults (JSONL to console)
//! FloodgateSubscriberBuilder::new().init();
//!
//! // Development mode with pretty human-readable output
//! FloodgateSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .init();
//! ```

pub mod config;
pub mod error;
pub mod layers;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use error::{LogError, LogResult};
pub use tracing_appender::non_blocking::WorkerGuard;

use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Builder for configuring and initializing the Floodgate logging subscriber
///
/// By default, console output uses JSONL format. Use `LogConfig::development()`
/// for human-readable pretty output during development.
pub struct FloodgateSubscriberBuilder {
    config: LogConfig,
}

impl FloodgateSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// The configuration that will be installed
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Try to initialize the subscriber globally
    ///
    /// Returns the file writer guard when file output is configured; keep it
    /// alive for the duration of the program so buffered lines are flushed.
    pub fn try_init(self) -> LogResult<Option<WorkerGuard>> {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&self.config.default_level)?,
        };

        let console = &self.config.console;
        let pretty_console = (console.enabled && console.pretty)
            .then(|| layers::pretty_layer(console.ansi));
        let jsonl_console = (console.enabled && !console.pretty)
            .then(|| layers::jsonl_layer(&self.config.jsonl, std::io::stdout));

        let (file_layer, guard) = match &self.config.file {
            Some(file_config) => {
                let (writer, guard) = layers::file_writer(file_config)?;
                (Some(layers::jsonl_layer(&self.config.jsonl, writer)), Some(guard))
            }
            None => (None, None),
        };

        Registry::default()
            .with(env_filter)
            .with(pretty_console)
            .with(jsonl_console)
            .with(file_layer)
            .try_init()?;

        Ok(guard)
    }

    /// Initialize the subscriber globally
    ///
    /// Failures (an already installed subscriber, an unwritable log
    /// directory) are reported on stderr and leave logging as it was.
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Warning: Failed to initialize logging: {}", e);
                None
            }
        }
    }
}

impl Default for FloodgateSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialize logging with default settings (JSONL to console)
pub fn init_default() {
    FloodgateSubscriberBuilder::new().init();
}

/// Initialize logging for development (verbose, pretty console output)
pub fn init_development() {
    FloodgateSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init();
}

/// Initialize logging for testing (minimal output)
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_testing() {
    let _ = FloodgateSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creation() {
        let builder = FloodgateSubscriberBuilder::new();
        assert_eq!(builder.config().default_level, "info");
    }

    #[test]
    fn test_default_is_jsonl() {
        let builder = FloodgateSubscriberBuilder::new();
        assert!(!builder.config().console.pretty); // JSONL by default
    }

    #[test]
    fn test_builder_with_config() {
        let builder = FloodgateSubscriberBuilder::new().with_config(LogConfig::development());
        assert_eq!(builder.config().default_level, "debug");
        assert!(builder.config().console.pretty);
    }

    #[test]
    fn test_builder_with_level_and_console() {
        let builder = FloodgateSubscriberBuilder::new()
            .with_level("trace")
            .with_console(false);
        assert_eq!(builder.config().default_level, "trace");
        assert!(!builder.config().console.enabled);
    }

    #[test]
    fn test_builder_with_file_output() {
        let builder = FloodgateSubscriberBuilder::new().with_file_output(FileConfig::in_dir("/tmp/x"));
        assert_eq!(builder.config().file.as_ref().unwrap().prefix, "floodgate");
    }
}
