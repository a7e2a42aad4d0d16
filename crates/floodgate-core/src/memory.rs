//! In-memory engine for testing
//!
//! Provides a [`PubSubEngine`] that never touches the network, so the
//! subscription adapter and application code can be tested without
//! binding endpoints.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use floodgate_core::{EngineOp, Handler, MemoryEngine, PeerRecord, PubSubEngine, Topic};
//!
//! let engine = MemoryEngine::new("local");
//! engine.start();
//! engine.add_peer(PeerRecord::new("peer-b").with_topics(["news"]));
//!
//! let topic = Topic::from("news");
//! engine.subscribe(&topic).await?;
//! engine.add_listener(&topic, Handler::new(|msg| println!("{:?}", msg.data)));
//!
//! // Loopback: our own publish reaches our handlers
//! engine.publish(&topic, b"hey".to_vec().into()).await?;
//! assert!(matches!(engine.journal().last(), Some(EngineOp::Publish(..))));
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::engine::{PeerRecord, PubSubEngine};
use crate::error::{EngineError, EngineResult};
use crate::handler::Handler;
use crate::listeners::ListenerRegistry;
use crate::message::Message;
use crate::topic::Topic;

/// An engine call recorded by [`MemoryEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOp {
    Subscribe(Topic),
    Unsubscribe(Topic),
    AddListener(Topic),
    RemoveListener(Topic),
    RemoveAllListeners(Topic),
    Publish(Topic, Bytes),
}

/// A pub/sub engine held entirely in memory
///
/// Peers are injected with [`add_peer`](Self::add_peer) instead of being
/// discovered. Every engine call is appended to a journal so tests can
/// assert call order.
pub struct MemoryEngine {
    /// Identity stamped on published messages
    local_id: String,
    /// Whether the engine has been started
    started: AtomicBool,
    /// Local handlers
    listeners: ListenerRegistry,
    /// Announced topics in subscription order
    subscriptions: Mutex<Vec<Topic>>,
    /// Known remote peers
    peers: DashMap<String, PeerRecord>,
    /// Every engine call, in order
    journal: Mutex<Vec<EngineOp>>,
    /// Failure injected into the next subscribe
    subscribe_failure: Mutex<Option<String>>,
    /// Failure injected into the next publish
    publish_failure: Mutex<Option<String>>,
}

impl MemoryEngine {
    /// Create a stopped engine with the given local identity
    pub fn new(local_id: impl Into<String>) -> Self {
        Self {
            local_id: local_id.into(),
            started: AtomicBool::new(false),
            listeners: ListenerRegistry::new(),
            subscriptions: Mutex::new(Vec::new()),
            peers: DashMap::new(),
            journal: Mutex::new(Vec::new()),
            subscribe_failure: Mutex::new(None),
            publish_failure: Mutex::new(None),
        }
    }

    /// Get our local identity
    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    /// Start the engine
    pub fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    /// Stop the engine
    pub fn stop(&self) {
        self.started.store(false, Ordering::SeqCst);
    }

    /// Add or replace a known peer
    pub fn add_peer(&self, peer: PeerRecord) {
        self.peers.insert(peer.id.clone(), peer);
    }

    /// Forget a peer
    pub fn remove_peer(&self, id: &str) {
        self.peers.remove(id);
    }

    /// Make the next `subscribe` call fail with the given reason
    pub fn fail_next_subscribe(&self, reason: impl Into<String>) {
        *self.subscribe_failure.lock() = Some(reason.into());
    }

    /// Make the next `publish` call fail with the given reason
    pub fn fail_next_publish(&self, reason: impl Into<String>) {
        *self.publish_failure.lock() = Some(reason.into());
    }

    /// Snapshot of every engine call so far
    pub fn journal(&self) -> Vec<EngineOp> {
        self.journal.lock().clone()
    }

    /// Forget recorded engine calls
    pub fn clear_journal(&self) {
        self.journal.lock().clear();
    }

    /// Check if a topic is announced
    pub fn is_subscribed(&self, topic: &Topic) -> bool {
        self.subscriptions.lock().contains(topic)
    }

    fn record(&self, op: EngineOp) {
        self.journal.lock().push(op);
    }
}

#[async_trait]
impl PubSubEngine for MemoryEngine {
    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    fn listener_count(&self, topic: &Topic) -> usize {
        self.listeners.count(topic)
    }

    fn add_listener(&self, topic: &Topic, handler: Handler) {
        self.record(EngineOp::AddListener(topic.clone()));
        self.listeners.add(topic, handler);
    }

    fn remove_listener(&self, topic: &Topic, handler: &Handler) {
        self.record(EngineOp::RemoveListener(topic.clone()));
        self.listeners.remove(topic, handler);
    }

    fn remove_all_listeners(&self, topic: &Topic) {
        self.record(EngineOp::RemoveAllListeners(topic.clone()));
        self.listeners.remove_all(topic);
    }

    async fn subscribe(&self, topic: &Topic) -> EngineResult<()> {
        self.record(EngineOp::Subscribe(topic.clone()));
        if let Some(reason) = self.subscribe_failure.lock().take() {
            return Err(EngineError::SubscribeFailed {
                topic: topic.clone(),
                reason,
            });
        }

        let mut subscriptions = self.subscriptions.lock();
        if !subscriptions.contains(topic) {
            subscriptions.push(topic.clone());
            debug!(topic = %topic, "Announced topic");
        }
        Ok(())
    }

    async fn unsubscribe(&self, topic: &Topic) -> EngineResult<()> {
        self.record(EngineOp::Unsubscribe(topic.clone()));
        self.subscriptions.lock().retain(|t| t != topic);
        debug!(topic = %topic, "Retracted topic");
        Ok(())
    }

    async fn publish(&self, topic: &Topic, data: Bytes) -> EngineResult<()> {
        if !self.is_started() {
            return Err(EngineError::NotStarted);
        }
        self.record(EngineOp::Publish(topic.clone(), data.clone()));
        if let Some(reason) = self.publish_failure.lock().take() {
            return Err(EngineError::PublishFailed {
                topic: topic.clone(),
                reason,
            });
        }

        if self.is_subscribed(topic) {
            let message = Message::new(self.local_id.clone(), topic.clone(), data);
            self.listeners.emit(topic, &message);
        }
        Ok(())
    }

    fn subscriptions(&self) -> Vec<Topic> {
        self.subscriptions.lock().clone()
    }

    fn peers(&self) -> Vec<PeerRecord> {
        let mut peers: Vec<PeerRecord> = self.peers.iter().map(|r| r.value().clone()).collect();
        peers.sort_by(|a, b| a.id.cmp(&b.id));
        peers
    }

    fn set_max_listeners(&self, n: usize) -> usize {
        self.listeners.set_max_listeners(n)
    }
}
