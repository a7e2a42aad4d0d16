//! Typed requests for adapter operations
//!
//! Optional arguments are resolved here, once, before an operation runs.
//! Each request converts from the short forms callers actually write:
//!
//! ```rust,ignore
//! pubsub.subscribe(("news", handler.clone())).await?;
//! pubsub.subscribe(("news", SubscribeOptions::default(), handler.clone())).await?;
//! pubsub.unsubscribe(("news", handler)).await?;   // one handler
//! pubsub.unsubscribe("news").await?;               // every handler
//! pubsub.peers("news").await?;                     // peers interested in "news"
//! pubsub.peers(PeersQuery::all()).await?;          // every peer
//! ```

use bytes::Bytes;
use floodgate_core::{Handler, Topic};

/// Options accepted by `subscribe`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Ask the engine to look for peers on this topic
    ///
    /// Engines without peer discovery ignore it.
    pub discover: bool,
}

/// A normalized `subscribe` request
#[derive(Debug, Clone)]
pub struct SubscribeRequest {
    pub topic: Topic,
    pub options: SubscribeOptions,
    pub handler: Handler,
}

impl SubscribeRequest {
    /// Subscribe a handler with default options
    pub fn new(topic: impl Into<Topic>, handler: Handler) -> Self {
        Self {
            topic: topic.into(),
            options: SubscribeOptions::default(),
            handler,
        }
    }

    /// Replace the options
    pub fn with_options(mut self, options: SubscribeOptions) -> Self {
        self.options = options;
        self
    }
}

impl<T: Into<Topic>> From<(T, Handler)> for SubscribeRequest {
    fn from((topic, handler): (T, Handler)) -> Self {
        Self::new(topic, handler)
    }
}

impl<T: Into<Topic>> From<(T, SubscribeOptions, Handler)> for SubscribeRequest {
    fn from((topic, options, handler): (T, SubscribeOptions, Handler)) -> Self {
        Self::new(topic, handler).with_options(options)
    }
}

/// A normalized `unsubscribe` request
///
/// Without a handler every handler of the topic is removed.
#[derive(Debug, Clone)]
pub struct UnsubscribeRequest {
    pub topic: Topic,
    pub handler: Option<Handler>,
}

impl UnsubscribeRequest {
    /// Remove every handler of a topic
    pub fn all(topic: impl Into<Topic>) -> Self {
        Self {
            topic: topic.into(),
            handler: None,
        }
    }

    /// Remove a single handler
    pub fn handler(topic: impl Into<Topic>, handler: Handler) -> Self {
        Self {
            topic: topic.into(),
            handler: Some(handler),
        }
    }
}

impl From<&str> for UnsubscribeRequest {
    fn from(topic: &str) -> Self {
        Self::all(topic)
    }
}

impl From<String> for UnsubscribeRequest {
    fn from(topic: String) -> Self {
        Self::all(topic)
    }
}

impl From<Topic> for UnsubscribeRequest {
    fn from(topic: Topic) -> Self {
        Self::all(topic)
    }
}

impl<T: Into<Topic>> From<(T, Handler)> for UnsubscribeRequest {
    fn from((topic, handler): (T, Handler)) -> Self {
        Self::handler(topic, handler)
    }
}

/// A normalized `peers` query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeersQuery {
    /// Only report peers interested in this topic
    pub topic: Option<Topic>,
}

impl PeersQuery {
    /// Every known peer
    pub fn all() -> Self {
        Self { topic: None }
    }

    /// Peers interested in a topic
    pub fn topic(topic: impl Into<Topic>) -> Self {
        Self {
            topic: Some(topic.into()),
        }
    }
}

impl From<&str> for PeersQuery {
    fn from(topic: &str) -> Self {
        Self::topic(topic)
    }
}

impl From<String> for PeersQuery {
    fn from(topic: String) -> Self {
        Self::topic(topic)
    }
}

impl From<Topic> for PeersQuery {
    fn from(topic: Topic) -> Self {
        Self::topic(topic)
    }
}

impl<T: Into<Topic>> From<Option<T>> for PeersQuery {
    fn from(topic: Option<T>) -> Self {
        Self {
            topic: topic.map(Into::into),
        }
    }
}

/// Payload handed to `publish`
///
/// Only binary payloads are published; anything else is rejected with
/// an invalid-argument error before the engine is involved.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishData {
    Binary(Bytes),
    Text(String),
    Json(serde_json::Value),
}

impl PublishData {
    /// Short name of the payload kind, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            PublishData::Binary(_) => "binary",
            PublishData::Text(_) => "text",
            PublishData::Json(_) => "json",
        }
    }
}

impl From<Bytes> for PublishData {
    fn from(data: Bytes) -> Self {
        PublishData::Binary(data)
    }
}

impl From<Vec<u8>> for PublishData {
    fn from(data: Vec<u8>) -> Self {
        PublishData::Binary(data.into())
    }
}

impl From<&[u8]> for PublishData {
    fn from(data: &[u8]) -> Self {
        PublishData::Binary(Bytes::copy_from_slice(data))
    }
}

impl<const N: usize> From<&[u8; N]> for PublishData {
    fn from(data: &[u8; N]) -> Self {
        PublishData::Binary(Bytes::copy_from_slice(data))
    }
}

impl From<String> for PublishData {
    fn from(data: String) -> Self {
        PublishData::Text(data)
    }
}

impl From<&str> for PublishData {
    fn from(data: &str) -> Self {
        PublishData::Text(data.to_string())
    }
}

impl From<serde_json::Value> for PublishData {
    fn from(data: serde_json::Value) -> Self {
        PublishData::Json(data)
    }
}
