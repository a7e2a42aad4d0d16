//! Pub/sub engine wrapper around iroh-gossip

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use floodgate_core::{
    EngineError, EngineResult, Handler, ListenerRegistry, Message, PeerRecord, PubSubEngine, Topic,
};
use iroh::{Endpoint, EndpointId, SecretKey};
use iroh_gossip::net::{GOSSIP_ALPN, Gossip};
use tracing::{debug, info, warn};

use crate::error::{GossipError, GossipResult};
use crate::message::SignedMessage;
use crate::peers::PeerTable;
use crate::topic::{TopicMembership, TopicReceiver, announce_interest, broadcast, gossip_topic_id};

/// How long a publish on an unsubscribed topic waits to reach a bootstrap peer
pub const PUBLISH_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Flooding pub/sub engine backed by iroh-gossip
pub struct GossipEngine {
    /// The underlying iroh-gossip instance
    gossip: Gossip,
    /// Secret key for signing messages
    secret_key: SecretKey,
    /// Our endpoint ID
    endpoint_id: EndpointId,
    /// Peers to contact when joining a topic
    bootstrap: Vec<EndpointId>,
    /// Whether the engine has been started
    started: AtomicBool,
    /// Local handlers
    listeners: Arc<ListenerRegistry>,
    /// Neighbors and their announced topics
    peers: Arc<PeerTable>,
    /// Topics we are subscribed to
    topics: DashMap<Topic, TopicMembership>,
}

impl GossipEngine {
    /// Create a new gossip engine
    ///
    /// This spawns the gossip protocol handler on the endpoint. The engine
    /// starts out stopped.
    pub fn new(endpoint: &Endpoint, secret_key: SecretKey, bootstrap: Vec<EndpointId>) -> Self {
        let gossip = Gossip::builder().spawn(endpoint.clone());
        let endpoint_id = endpoint.id();

        Self {
            gossip,
            secret_key,
            endpoint_id,
            bootstrap,
            started: AtomicBool::new(false),
            listeners: Arc::new(ListenerRegistry::new()),
            peers: Arc::new(PeerTable::new()),
            topics: DashMap::new(),
        }
    }

    /// Get the underlying Gossip instance for router registration
    ///
    /// Use this with `Router::builder(endpoint).accept(GOSSIP_ALPN, engine.gossip().clone())`
    pub fn gossip(&self) -> &Gossip {
        &self.gossip
    }

    /// Get the ALPN protocol identifier for gossip
    pub fn alpn() -> &'static [u8] {
        GOSSIP_ALPN
    }

    /// Get our endpoint ID
    pub fn endpoint_id(&self) -> EndpointId {
        self.endpoint_id
    }

    /// Identity stamped on our messages
    pub fn local_id(&self) -> String {
        self.secret_key.public().to_string()
    }

    /// Start accepting publishes
    pub fn start(&self) {
        if !self.started.swap(true, Ordering::SeqCst) {
            info!(endpoint = %self.endpoint_id, "Gossip engine started");
        }
    }

    /// Stop the engine and leave every topic
    ///
    /// Local handlers stay attached.
    pub fn stop(&self) {
        if self.started.swap(false, Ordering::SeqCst) {
            self.topics.clear();
            self.peers.clear();
            info!(endpoint = %self.endpoint_id, "Gossip engine stopped");
        }
    }

    /// Number of gossip topics currently joined
    ///
    /// Publishing on a topic we are not subscribed to joins it only for the
    /// duration of the broadcast, so this counts subscriptions.
    pub fn joined_count(&self) -> usize {
        self.topics.len()
    }

    /// Join a gossip topic, spawn its receive loop, and announce our interest
    async fn join(&self, topic: &Topic) -> GossipResult<TopicMembership> {
        let gossip_topic = self
            .gossip
            .subscribe(gossip_topic_id(topic).into(), self.bootstrap.clone())
            .await
            .map_err(|e| GossipError::SubscribeFailed(e.to_string()))?;

        let (sender, receiver) = gossip_topic.split();
        let receiver = TopicReceiver::new(
            topic.clone(),
            receiver,
            sender.clone(),
            self.secret_key.clone(),
            self.listeners.clone(),
            self.peers.clone(),
        );
        let receive_task = tokio::spawn(receiver.run());

        // Neighbors that show up later are told by the receive loop
        if let Err(e) = announce_interest(&sender, &self.secret_key, topic, true).await {
            warn!(topic = %topic, error = %e, "Failed to announce interest");
        }

        debug!(topic = %topic, "Joined gossip topic");
        Ok(TopicMembership::new(sender, receive_task))
    }

    /// Sign one message per payload
    fn sign_all(&self, topic: &Topic, data: Vec<Bytes>) -> GossipResult<Vec<(Message, Vec<u8>)>> {
        data.into_iter()
            .map(|payload| -> GossipResult<(Message, Vec<u8>)> {
                let message = Message::new(self.local_id(), topic.clone(), payload);
                let encoded = SignedMessage::sign_and_encode(&self.secret_key, &message)?;
                Ok((message, encoded))
            })
            .collect()
    }

    /// Broadcast signed messages on a topic, joining it only for the duration
    ///
    /// Subscribed topics reuse their membership and deliver each message to
    /// local handlers as well, since gossip never echoes our own messages.
    async fn broadcast_signed(&self, topic: &Topic, signed: Vec<(Message, Vec<u8>)>) -> GossipResult<()> {
        let subscribed = self.topics.get(topic).map(|m| m.sender());
        if let Some(sender) = subscribed {
            for (message, encoded) in signed {
                broadcast(&sender, encoded).await?;
                self.listeners.emit(topic, &message);
            }
            return Ok(());
        }

        let mut gossip_topic = self
            .gossip
            .subscribe(gossip_topic_id(topic).into(), self.bootstrap.clone())
            .await
            .map_err(|e| GossipError::SubscribeFailed(e.to_string()))?;

        if !self.bootstrap.is_empty() {
            match tokio::time::timeout(PUBLISH_JOIN_TIMEOUT, gossip_topic.joined()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(GossipError::SubscribeFailed(e.to_string())),
                Err(_) => debug!(topic = %topic, "No bootstrap peer reached before publishing"),
            }
        }

        for (_, encoded) in signed {
            gossip_topic
                .broadcast(encoded.into())
                .await
                .map_err(|e| GossipError::BroadcastFailed(e.to_string()))?;
        }

        // Dropping the handle leaves the swarm
        drop(gossip_topic);
        debug!(topic = %topic, "Published without subscribing");
        Ok(())
    }
}

#[async_trait]
impl PubSubEngine for GossipEngine {
    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    fn listener_count(&self, topic: &Topic) -> usize {
        self.listeners.count(topic)
    }

    fn add_listener(&self, topic: &Topic, handler: Handler) {
        self.listeners.add(topic, handler);
    }

    fn remove_listener(&self, topic: &Topic, handler: &Handler) {
        self.listeners.remove(topic, handler);
    }

    fn remove_all_listeners(&self, topic: &Topic) {
        self.listeners.remove_all(topic);
    }

    async fn subscribe(&self, topic: &Topic) -> EngineResult<()> {
        if self.topics.contains_key(topic) {
            return Ok(());
        }

        let membership = self.join(topic).await.map_err(|e| e.for_topic(topic))?;
        self.topics.insert(topic.clone(), membership);
        Ok(())
    }

    async fn unsubscribe(&self, topic: &Topic) -> EngineResult<()> {
        if let Some((_, membership)) = self.topics.remove(topic) {
            if let Err(e) = announce_interest(&membership.sender(), &self.secret_key, topic, false).await {
                debug!(topic = %topic, error = %e, "Failed to retract interest");
            }
            drop(membership);
            self.peers.forget_topic(topic);
            debug!(topic = %topic, "Left gossip topic");
        }
        Ok(())
    }

    async fn publish(&self, topic: &Topic, data: Bytes) -> EngineResult<()> {
        self.publish_many(topic, vec![data]).await
    }

    async fn publish_many(&self, topic: &Topic, data: Vec<Bytes>) -> EngineResult<()> {
        if !self.is_started() {
            return Err(EngineError::NotStarted);
        }
        if data.is_empty() {
            return Ok(());
        }

        let signed = self.sign_all(topic, data).map_err(|e| e.for_topic(topic))?;
        self.broadcast_signed(topic, signed)
            .await
            .map_err(|e| e.for_topic(topic))
    }

    fn subscriptions(&self) -> Vec<Topic> {
        let mut topics: Vec<Topic> = self.topics.iter().map(|r| r.key().clone()).collect();
        topics.sort();
        topics
    }

    fn peers(&self) -> Vec<PeerRecord> {
        self.peers.records()
    }

    fn set_max_listeners(&self, n: usize) -> usize {
        self.listeners.set_max_listeners(n)
    }
}

/// Builder for creating a GossipEngine instance
pub struct GossipEngineBuilder {
    secret_key: Option<SecretKey>,
    bootstrap: Vec<EndpointId>,
    max_listeners: Option<usize>,
}

impl GossipEngineBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            secret_key: None,
            bootstrap: Vec::new(),
            max_listeners: None,
        }
    }

    /// Set the secret key for signing messages
    pub fn secret_key(mut self, key: SecretKey) -> Self {
        self.secret_key = Some(key);
        self
    }

    /// Set the peers contacted when joining a topic
    pub fn bootstrap(mut self, peers: Vec<EndpointId>) -> Self {
        self.bootstrap = peers;
        self
    }

    /// Set the per-topic listener warn threshold
    pub fn max_listeners(mut self, n: usize) -> Self {
        self.max_listeners = Some(n);
        self
    }

    /// Build the gossip engine
    pub fn build(self, endpoint: &Endpoint) -> GossipEngine {
        let secret_key = self
            .secret_key
            .unwrap_or_else(|| SecretKey::generate(&mut rand::rng()));
        let engine = GossipEngine::new(endpoint, secret_key, self.bootstrap);
        if let Some(n) = self.max_listeners {
            engine.set_max_listeners(n);
        }
        engine
    }
}

impl Default for GossipEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_default() {
        let builder = GossipEngineBuilder::new();
        assert!(builder.secret_key.is_none());
        assert!(builder.bootstrap.is_empty());
        assert!(builder.max_listeners.is_none());
    }

    #[test]
    fn test_builder_with_key() {
        let key = SecretKey::generate(&mut rand::rng());
        let key_public = key.public();
        let builder = GossipEngineBuilder::new().secret_key(key).max_listeners(3);
        assert_eq!(builder.secret_key.unwrap().public(), key_public);
        assert_eq!(builder.max_listeners, Some(3));
    }
}
