//! Collaborator traits for the subscription adapter
//!
//! The adapter never talks to the network itself. It is written against two
//! small contracts:
//!
//! - [`NodeStatus`]: whether the owning node has been started
//! - [`PubSubEngine`]: the flooding pub/sub engine bound to that node
//!
//! Engines keep their own local handler bookkeeping (usually through a
//! [`ListenerRegistry`](crate::ListenerRegistry)); the adapter derives topic
//! interest from [`PubSubEngine::listener_count`] instead of keeping a counter.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::handler::Handler;
use crate::topic::Topic;

/// Readiness predicate of a node
pub trait NodeStatus: Send + Sync {
    /// Check if the node is started
    fn is_started(&self) -> bool;
}

/// Shared started flag for a node
///
/// The composition root flips the flag during its lifecycle and hands a
/// shared reference to whoever needs to observe it.
#[derive(Debug, Default)]
pub struct NodeState {
    started: AtomicBool,
}

impl NodeState {
    /// Create a flag in the not-started state
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the node started, returning the previous value
    pub fn mark_started(&self) -> bool {
        self.started.swap(true, Ordering::SeqCst)
    }

    /// Mark the node stopped, returning the previous value
    pub fn mark_stopped(&self) -> bool {
        self.started.swap(false, Ordering::SeqCst)
    }
}

impl NodeStatus for NodeState {
    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

/// A remote peer known to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRecord {
    /// Stable identity string of the peer
    pub id: String,
    /// Topics the peer has announced interest in
    pub topics: BTreeSet<Topic>,
}

impl PeerRecord {
    /// Create a peer record with no topics
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            topics: BTreeSet::new(),
        }
    }

    /// Builder-style helper adding topics of interest
    pub fn with_topics<I, T>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Topic>,
    {
        self.topics.extend(topics.into_iter().map(Into::into));
        self
    }

    /// Check if the peer is interested in a topic
    pub fn is_interested_in(&self, topic: &Topic) -> bool {
        self.topics.contains(topic)
    }
}

/// A flooding pub/sub engine bound to one node
///
/// Handler registration is local only. Network-level interest is announced
/// and retracted with [`subscribe`](Self::subscribe) and
/// [`unsubscribe`](Self::unsubscribe); callers decide when to do so.
#[async_trait]
pub trait PubSubEngine: Send + Sync {
    /// Check if the engine is started
    fn is_started(&self) -> bool;

    /// Number of local handlers attached to a topic
    fn listener_count(&self, topic: &Topic) -> usize;

    /// Attach a local handler to a topic
    fn add_listener(&self, topic: &Topic, handler: Handler);

    /// Detach one local handler from a topic
    fn remove_listener(&self, topic: &Topic, handler: &Handler);

    /// Detach every local handler from a topic
    fn remove_all_listeners(&self, topic: &Topic);

    /// Announce interest in a topic to the network
    async fn subscribe(&self, topic: &Topic) -> EngineResult<()>;

    /// Retract interest in a topic from the network
    async fn unsubscribe(&self, topic: &Topic) -> EngineResult<()>;

    /// Publish a payload on a topic
    async fn publish(&self, topic: &Topic, data: Bytes) -> EngineResult<()>;

    /// Publish several payloads on a topic in order
    ///
    /// Stops at the first failure; payloads before it have been published.
    async fn publish_many(&self, topic: &Topic, data: Vec<Bytes>) -> EngineResult<()> {
        for payload in data {
            self.publish(topic, payload).await?;
        }
        Ok(())
    }

    /// Topics this node has announced interest in, in engine order
    fn subscriptions(&self) -> Vec<Topic>;

    /// Remote peers currently known to the engine
    fn peers(&self) -> Vec<PeerRecord>;

    /// Set the per-topic handler warn threshold, returning the previous value
    fn set_max_listeners(&self, n: usize) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_state_transitions() {
        let state = NodeState::new();
        assert!(!state.is_started());

        assert!(!state.mark_started());
        assert!(state.is_started());
        assert!(state.mark_started());

        assert!(state.mark_stopped());
        assert!(!state.is_started());
    }

    #[test]
    fn test_peer_interest() {
        let peer = PeerRecord::new("peer-a").with_topics(["news", "sports"]);
        assert!(peer.is_interested_in(&Topic::from("news")));
        assert!(!peer.is_interested_in(&Topic::from("weather")));
    }
}
