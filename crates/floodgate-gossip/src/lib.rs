//! # Floodgate Gossip
//!
//! Flooding pub/sub engine for Floodgate, built on iroh-gossip.
//!
//! [`GossipEngine`] implements [`floodgate_core::PubSubEngine`]: each
//! topic maps to an iroh-gossip topic, messages are signed with the node's
//! key, and signed interest announcements exchanged with direct neighbors
//! feed the engine's view of which peers are interested in which topics.
//!
//! ## Features
//!
//! - One gossip swarm per subscribed topic
//! - Publishing on other topics joins their swarm only for the broadcast
//! - Automatic message signing and verification
//! - Local delivery of our own publishes on subscribed topics
//! - Peer topic-interest tracking from interest announcements
//!
//! ## Example
//!
//! ```rust,ignore
//! use floodgate_core::{Handler, PubSubEngine, Topic};
//! use floodgate_gossip::{GossipEngine, GossipEngineBuilder};
//! use iroh::protocol::Router;
//!
//! let endpoint = iroh::Endpoint::builder().bind().await?;
//! let engine = GossipEngineBuilder::new().build(&endpoint);
//!
//! // Register with router
//! let router = Router::builder(endpoint.clone())
//!     .accept(GossipEngine::alpn(), engine.gossip().clone())
//!     .spawn();
//!
//! engine.start();
//! let topic = Topic::from("news");
//! engine.subscribe(&topic).await?;
//! engine.add_listener(&topic, Handler::new(|msg| println!("{:?}", msg.data)));
//! engine.publish(&topic, b"hello".to_vec().into()).await?;
//! ```

pub mod engine;
pub mod error;
pub mod message;
pub mod peers;
pub mod topic;

// Re-exports
pub use engine::{GossipEngine, GossipEngineBuilder, PUBLISH_JOIN_TIMEOUT};
pub use error::{GossipError, GossipResult};
pub use message::{Envelope, InterestAnnouncement, ReceivedMessage, SignedMessage, WireMessage};
pub use peers::PeerTable;
pub use topic::gossip_topic_id;

// Re-export iroh-gossip ALPN for router registration
pub use iroh_gossip::net::GOSSIP_ALPN;
