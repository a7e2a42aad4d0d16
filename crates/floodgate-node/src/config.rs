//! Configuration for a Floodgate node

use std::path::Path;

use floodgate_core::DEFAULT_MAX_LISTENERS;
use floodgate_logging::{FloodgateSubscriberBuilder, LogConfig, WorkerGuard};
use iroh::{EndpointId, SecretKey};
use serde::{Deserialize, Serialize};

use crate::error::{NodeError, NodeResult};

/// Configuration for a FloodNode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Hex-encoded 32-byte secret key; generated when absent
    pub secret_key: Option<String>,
    /// Endpoint ids contacted when joining a topic
    pub bootstrap: Vec<String>,
    /// Per-topic handler count above which a warning is logged (0 = unlimited)
    pub max_listeners: usize,
    /// Logging configuration
    pub logging: LogConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            bootstrap: Vec::new(),
            max_listeners: DEFAULT_MAX_LISTENERS,
            logging: LogConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load a configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> NodeResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(s: &str) -> NodeResult<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Set the secret key
    pub fn with_secret_key(mut self, key: &SecretKey) -> Self {
        self.secret_key = Some(hex::encode(key.to_bytes()));
        self
    }

    /// Add a bootstrap peer
    pub fn with_bootstrap(mut self, peer: EndpointId) -> Self {
        self.bootstrap.push(peer.to_string());
        self
    }

    /// Set the listener warn threshold
    pub fn with_max_listeners(mut self, n: usize) -> Self {
        self.max_listeners = n;
        self
    }

    /// Set the logging configuration
    pub fn with_logging(mut self, logging: LogConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Decode the configured secret key, if any
    pub fn parse_secret_key(&self) -> NodeResult<Option<SecretKey>> {
        let Some(encoded) = &self.secret_key else {
            return Ok(None);
        };
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(encoded.trim(), &mut bytes)
            .map_err(|e| NodeError::Config(format!("invalid secret key: {}", e)))?;
        Ok(Some(SecretKey::from_bytes(&bytes)))
    }

    /// Parse the bootstrap peers
    pub fn parse_bootstrap(&self) -> NodeResult<Vec<EndpointId>> {
        self.bootstrap
            .iter()
            .map(|s| {
                s.trim()
                    .parse::<EndpointId>()
                    .map_err(|e| NodeError::Config(format!("invalid bootstrap peer {:?}: {}", s, e)))
            })
            .collect()
    }

    /// Install the global tracing subscriber described by `logging`
    ///
    /// Keep the returned guard alive while logging to files.
    pub fn init_logging(&self) -> NodeResult<Option<WorkerGuard>> {
        Ok(FloodgateSubscriberBuilder::new()
            .with_config(self.logging.clone())
            .try_init()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert!(config.secret_key.is_none());
        assert!(config.bootstrap.is_empty());
        assert_eq!(config.max_listeners, 10);
        assert!(config.parse_secret_key().unwrap().is_none());
    }

    #[test]
    fn test_secret_key_roundtrip() {
        let key = SecretKey::generate(&mut rand::rng());
        let config = NodeConfig::default().with_secret_key(&key);

        let parsed = config.parse_secret_key().unwrap().unwrap();
        assert_eq!(parsed.public(), key.public());
    }

    #[test]
    fn test_invalid_secret_key() {
        let config = NodeConfig {
            secret_key: Some("not-hex".to_string()),
            ..Default::default()
        };
        assert!(matches!(config.parse_secret_key(), Err(NodeError::Config(_))));

        let short = NodeConfig {
            secret_key: Some("abcd".to_string()),
            ..Default::default()
        };
        assert!(matches!(short.parse_secret_key(), Err(NodeError::Config(_))));
    }

    #[test]
    fn test_bootstrap_parsing() {
        let peer = SecretKey::generate(&mut rand::rng()).public();
        let config = NodeConfig::default().with_bootstrap(peer);
        assert_eq!(config.parse_bootstrap().unwrap(), vec![peer]);

        let bad = NodeConfig {
            bootstrap: vec!["nope".to_string()],
            ..Default::default()
        };
        assert!(matches!(bad.parse_bootstrap(), Err(NodeError::Config(_))));
    }

    #[test]
    fn test_toml_partial() {
        let config = NodeConfig::from_toml_str("max_listeners = 0\n").unwrap();
        assert_eq!(config.max_listeners, 0);
        assert!(config.bootstrap.is_empty());
        assert_eq!(config.logging, LogConfig::default());
    }

    #[test]
    fn test_toml_invalid() {
        let result = NodeConfig::from_toml_str("max_listeners = \"many\"");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
