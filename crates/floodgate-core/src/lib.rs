//! # Floodgate Core
//!
//! Core traits, types, and errors shared by the Floodgate pub/sub stack.
//!
//! The subscription adapter in `floodgate-pubsub` is written against the
//! collaborator traits defined here, so the same adapter logic runs on the
//! real gossip engine (`floodgate-gossip`) and on the in-memory
//! [`MemoryEngine`] used in tests.
//!
//! ## Key Traits
//!
//! - [`PubSubEngine`]: A flooding pub/sub engine bound to one node
//! - [`NodeStatus`]: Readiness predicate of the node that owns the engine
//!
//! ## Key Types
//!
//! - [`Topic`]: String-named channel
//! - [`Handler`]: Shared message callback, compared by identity
//! - [`Message`]: A message delivered to handlers
//! - [`PeerRecord`]: A remote peer and the topics it is interested in
//! - [`ListenerRegistry`]: Per-topic handler bookkeeping for engine implementations

pub mod engine;
pub mod error;
pub mod handler;
pub mod listeners;
pub mod memory;
pub mod message;
pub mod topic;

// Re-export main types
pub use engine::{NodeState, NodeStatus, PeerRecord, PubSubEngine};
pub use error::{EngineError, EngineResult};
pub use handler::Handler;
pub use listeners::{DEFAULT_MAX_LISTENERS, ListenerRegistry};
pub use memory::{EngineOp, MemoryEngine};
pub use message::{Message, SEQNO_LEN, random_seqno};
pub use topic::Topic;
