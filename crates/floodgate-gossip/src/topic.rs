//! Per-topic gossip membership and receive loop

use std::sync::Arc;

use floodgate_core::{ListenerRegistry, Topic};
use iroh::SecretKey;
use iroh_gossip::api::{Event, GossipReceiver, GossipSender};
use n0_future::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{GossipError, GossipResult};
use crate::message::{Envelope, SignedMessage};
use crate::peers::PeerTable;

/// Derive the gossip topic id for a topic name
pub fn gossip_topic_id(topic: &Topic) -> [u8; 32] {
    *blake3::hash(topic.as_str().as_bytes()).as_bytes()
}

/// Our subscription to one gossip topic
///
/// Dropping the membership stops its receive loop and releases the sender,
/// which leaves the gossip topic.
pub(crate) struct TopicMembership {
    /// Sender half of the gossip topic
    sender: GossipSender,
    /// Task draining the receiver half
    receive_task: JoinHandle<()>,
}

impl TopicMembership {
    pub(crate) fn new(sender: GossipSender, receive_task: JoinHandle<()>) -> Self {
        Self {
            sender,
            receive_task,
        }
    }

    pub(crate) fn sender(&self) -> GossipSender {
        self.sender.clone()
    }
}

impl Drop for TopicMembership {
    fn drop(&mut self) {
        self.receive_task.abort();
    }
}

/// Broadcast raw bytes to the whole topic swarm
pub(crate) async fn broadcast(sender: &GossipSender, data: Vec<u8>) -> GossipResult<()> {
    sender
        .broadcast(data.into())
        .await
        .map_err(|e| GossipError::BroadcastFailed(e.to_string()))
}

/// Tell our direct neighbors on a topic whether we are interested in it
pub(crate) async fn announce_interest(
    sender: &GossipSender,
    secret_key: &SecretKey,
    topic: &Topic,
    announced: bool,
) -> GossipResult<()> {
    let encoded = SignedMessage::sign_interest(secret_key, topic, announced)?;
    sender
        .broadcast_neighbors(encoded.into())
        .await
        .map_err(|e| GossipError::BroadcastFailed(e.to_string()))
}

/// What handling one gossip event did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventOutcome {
    /// A message was delivered to this many local handlers
    Delivered(usize),
    /// A peer's topic interest was updated
    InterestUpdated,
    /// A new direct neighbor appeared
    NeighborUp,
    /// A direct neighbor went away
    NeighborDown,
    /// The event was dropped or carried nothing to act on
    Ignored,
}

/// Apply one gossip event for `topic` to the local handlers and peer table
pub(crate) fn handle_event(
    topic: &Topic,
    listeners: &ListenerRegistry,
    peers: &PeerTable,
    event: Event,
) -> EventOutcome {
    match event {
        Event::NeighborUp(id) => {
            debug!(topic = %topic, peer = %id, "Neighbor up");
            peers.neighbor_up(id.to_string(), topic);
            EventOutcome::NeighborUp
        }
        Event::NeighborDown(id) => {
            debug!(topic = %topic, peer = %id, "Neighbor down");
            peers.neighbor_down(&id.to_string(), topic);
            EventOutcome::NeighborDown
        }
        Event::Received(msg) => match SignedMessage::open(&msg.content) {
            Ok(Envelope::Message(received)) => {
                if !received.message.topics.contains(topic) {
                    warn!(topic = %topic, from = %received.from, "Dropping message for another topic");
                    return EventOutcome::Ignored;
                }
                EventOutcome::Delivered(listeners.emit(topic, &received.message))
            }
            Ok(Envelope::Interest(interest)) => {
                if interest.topic != *topic {
                    warn!(topic = %topic, from = %interest.from, "Dropping interest for another topic");
                    return EventOutcome::Ignored;
                }
                debug!(topic = %topic, peer = %interest.from, announced = interest.announced, "Peer interest");
                peers.set_interest(interest.from.to_string(), topic, interest.announced);
                EventOutcome::InterestUpdated
            }
            Err(e) => {
                // Log and skip invalid messages
                warn!(topic = %topic, error = %e, "Failed to process gossip message");
                EventOutcome::Ignored
            }
        },
        Event::Lagged => {
            warn!(topic = %topic, "Gossip receiver lagged, messages were dropped");
            EventOutcome::Ignored
        }
    }
}

/// Drains gossip events for one subscribed topic
pub(crate) struct TopicReceiver {
    topic: Topic,
    receiver: GossipReceiver,
    sender: GossipSender,
    secret_key: SecretKey,
    listeners: Arc<ListenerRegistry>,
    peers: Arc<PeerTable>,
}

impl TopicReceiver {
    pub(crate) fn new(
        topic: Topic,
        receiver: GossipReceiver,
        sender: GossipSender,
        secret_key: SecretKey,
        listeners: Arc<ListenerRegistry>,
        peers: Arc<PeerTable>,
    ) -> Self {
        Self {
            topic,
            receiver,
            sender,
            secret_key,
            listeners,
            peers,
        }
    }

    /// Process events until the topic closes
    pub(crate) async fn run(mut self) {
        loop {
            match self.receiver.try_next().await {
                Ok(Some(event)) => {
                    let outcome = handle_event(&self.topic, &self.listeners, &self.peers, event);
                    // New neighbors learn our interest directly from us
                    if outcome == EventOutcome::NeighborUp {
                        if let Err(e) =
                            announce_interest(&self.sender, &self.secret_key, &self.topic, true).await
                        {
                            warn!(topic = %self.topic, error = %e, "Failed to announce interest");
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(topic = %self.topic, error = %e, "Gossip receiver failed");
                    break;
                }
            }
        }
        debug!(topic = %self.topic, "Gossip receive loop ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use floodgate_core::{Handler, Message};
    use iroh::EndpointId;
    use iroh_gossip::api::Message as GossipMessage;
    use iroh_gossip::proto::DeliveryScope;
    use parking_lot::Mutex;

    struct Fixture {
        topic: Topic,
        listeners: ListenerRegistry,
        peers: PeerTable,
        received: Arc<Mutex<Vec<Message>>>,
    }

    impl Fixture {
        fn new(topic: &str) -> Self {
            let topic = Topic::from(topic);
            let listeners = ListenerRegistry::new();
            let received = Arc::new(Mutex::new(Vec::new()));
            let sink = received.clone();
            listeners.add(&topic, Handler::new(move |msg| sink.lock().push(msg.clone())));
            Self {
                topic,
                listeners,
                peers: PeerTable::new(),
                received,
            }
        }

        fn handle(&self, event: Event) -> EventOutcome {
            handle_event(&self.topic, &self.listeners, &self.peers, event)
        }
    }

    fn random_key() -> SecretKey {
        SecretKey::generate(&mut rand::rng())
    }

    fn received_event(content: Vec<u8>, delivered_from: EndpointId) -> Event {
        Event::Received(GossipMessage {
            content: Bytes::from(content),
            scope: DeliveryScope::Neighbors,
            delivered_from,
        })
    }

    #[test]
    fn test_topic_id_derivation() {
        let topic = Topic::from("news");

        // Topic ID should be deterministic
        assert_eq!(gossip_topic_id(&topic), gossip_topic_id(&Topic::from("news")));
        assert_ne!(gossip_topic_id(&topic), gossip_topic_id(&Topic::from("sports")));
    }

    #[test]
    fn test_remote_message_is_delivered() {
        let fixture = Fixture::new("Z");
        let remote = random_key();
        let message = Message::new(remote.public().to_string(), "Z", b"banana".to_vec());
        let encoded = SignedMessage::sign_and_encode(&remote, &message).unwrap();

        let outcome = fixture.handle(received_event(encoded, remote.public()));

        assert_eq!(outcome, EventOutcome::Delivered(1));
        let received = fixture.received.lock();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].from, remote.public().to_string());
        assert_eq!(received[0].data, Bytes::from_static(b"banana"));
        assert_eq!(received[0].seqno, message.seqno);
        assert_eq!(received[0].topics, vec![Topic::from("Z")]);
    }

    #[test]
    fn test_message_for_another_topic_is_dropped() {
        let fixture = Fixture::new("Z");
        let remote = random_key();
        let message = Message::new(remote.public().to_string(), "Y", b"banana".to_vec());
        let encoded = SignedMessage::sign_and_encode(&remote, &message).unwrap();

        let outcome = fixture.handle(received_event(encoded, remote.public()));

        assert_eq!(outcome, EventOutcome::Ignored);
        assert!(fixture.received.lock().is_empty());
    }

    #[test]
    fn test_invalid_signature_is_skipped() {
        let fixture = Fixture::new("Z");
        let remote = random_key();
        let message = Message::new(remote.public().to_string(), "Z", b"banana".to_vec());
        let mut encoded = SignedMessage::sign_and_encode(&remote, &message).unwrap();
        if let Some(byte) = encoded.last_mut() {
            *byte = byte.wrapping_add(1);
        }

        assert_eq!(fixture.handle(received_event(encoded, remote.public())), EventOutcome::Ignored);
        assert_eq!(
            fixture.handle(received_event(b"garbage".to_vec(), remote.public())),
            EventOutcome::Ignored
        );
        assert!(fixture.received.lock().is_empty());
    }

    #[test]
    fn test_neighbor_without_announcement_has_no_topics() {
        let fixture = Fixture::new("Z");
        let publisher = random_key().public();

        assert_eq!(fixture.handle(Event::NeighborUp(publisher)), EventOutcome::NeighborUp);

        let records = fixture.peers.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, publisher.to_string());
        assert!(!records[0].is_interested_in(&fixture.topic));
    }

    #[test]
    fn test_interest_announcement_updates_peers() {
        let fixture = Fixture::new("Z");
        let remote = random_key();
        fixture.handle(Event::NeighborUp(remote.public()));

        let announce = SignedMessage::sign_interest(&remote, &Topic::from("Z"), true).unwrap();
        assert_eq!(
            fixture.handle(received_event(announce, remote.public())),
            EventOutcome::InterestUpdated
        );
        assert!(fixture.peers.records()[0].is_interested_in(&fixture.topic));
        assert!(fixture.received.lock().is_empty());

        let retract = SignedMessage::sign_interest(&remote, &Topic::from("Z"), false).unwrap();
        fixture.handle(received_event(retract, remote.public()));
        assert!(!fixture.peers.records()[0].is_interested_in(&fixture.topic));
    }

    #[test]
    fn test_interest_for_another_topic_is_dropped() {
        let fixture = Fixture::new("Z");
        let remote = random_key();

        let announce = SignedMessage::sign_interest(&remote, &Topic::from("Y"), true).unwrap();
        assert_eq!(fixture.handle(received_event(announce, remote.public())), EventOutcome::Ignored);
        assert!(fixture.peers.is_empty());
    }

    #[test]
    fn test_neighbor_down_forgets_peer() {
        let fixture = Fixture::new("Z");
        let remote = random_key();
        fixture.handle(Event::NeighborUp(remote.public()));
        let announce = SignedMessage::sign_interest(&remote, &Topic::from("Z"), true).unwrap();
        fixture.handle(received_event(announce, remote.public()));

        assert_eq!(fixture.handle(Event::NeighborDown(remote.public())), EventOutcome::NeighborDown);
        assert!(fixture.peers.is_empty());
    }

    #[test]
    fn test_lagged_is_ignored() {
        let fixture = Fixture::new("Z");
        assert_eq!(fixture.handle(Event::Lagged), EventOutcome::Ignored);
    }
}
