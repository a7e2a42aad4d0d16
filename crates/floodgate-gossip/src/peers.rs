//! Peer tracking from gossip neighbor events and interest announcements

use std::collections::BTreeSet;

use dashmap::DashMap;
use floodgate_core::{PeerRecord, Topic};

/// What we know about one peer
#[derive(Debug, Default)]
struct PeerEntry {
    /// Topics on which the peer is a direct neighbor
    neighbor_on: BTreeSet<Topic>,
    /// Topics the peer has announced interest in
    interests: BTreeSet<Topic>,
}

impl PeerEntry {
    fn is_empty(&self) -> bool {
        self.neighbor_on.is_empty() && self.interests.is_empty()
    }
}

/// Peers seen on our gossip topics
///
/// Being a neighbor on a topic's swarm only makes a peer known; a peer
/// that joined the swarm just to publish is listed with no topics. Topic
/// interest comes solely from the peer's signed interest announcements.
#[derive(Debug, Default)]
pub struct PeerTable {
    peers: DashMap<String, PeerEntry>,
}

impl PeerTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a peer is a neighbor on a topic
    pub fn neighbor_up(&self, peer: impl Into<String>, topic: &Topic) {
        self.peers
            .entry(peer.into())
            .or_default()
            .neighbor_on
            .insert(topic.clone());
    }

    /// Record that a peer left a topic; peers we share nothing with are forgotten
    pub fn neighbor_down(&self, peer: &str, topic: &Topic) {
        if let Some(mut entry) = self.peers.get_mut(peer) {
            entry.neighbor_on.remove(topic);
            entry.interests.remove(topic);
        }
        self.peers.remove_if(peer, |_, entry| entry.is_empty());
    }

    /// Apply an interest announcement from a direct neighbor
    pub fn set_interest(&self, peer: impl Into<String>, topic: &Topic, announced: bool) {
        let peer = peer.into();
        if announced {
            let mut entry = self.peers.entry(peer).or_default();
            entry.neighbor_on.insert(topic.clone());
            entry.interests.insert(topic.clone());
        } else if let Some(mut entry) = self.peers.get_mut(&peer) {
            entry.interests.remove(topic);
        }
    }

    /// Forget a topic for every peer (we left it)
    pub fn forget_topic(&self, topic: &Topic) {
        for mut entry in self.peers.iter_mut() {
            entry.neighbor_on.remove(topic);
            entry.interests.remove(topic);
        }
        self.peers.retain(|_, entry| !entry.is_empty());
    }

    /// Forget everything
    pub fn clear(&self) {
        self.peers.clear();
    }

    /// Number of known peers
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Check if no peers are known
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Snapshot of known peers with their announced topics, sorted by identity
    pub fn records(&self) -> Vec<PeerRecord> {
        let mut records: Vec<PeerRecord> = self
            .peers
            .iter()
            .map(|r| PeerRecord {
                id: r.key().clone(),
                topics: r.value().interests.clone(),
            })
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }
}
