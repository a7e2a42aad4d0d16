//! # Floodgate PubSub
//!
//! Subscription adapter between a node and its flooding pub/sub engine.
//!
//! The adapter translates an application-facing API into correctly
//! sequenced engine calls. It enforces two rules:
//!
//! - No operation proceeds until the node or the engine is started
//! - The engine announces interest in a topic at most once, no matter how
//!   many local handlers are attached, and retracts it only when the last
//!   handler leaves
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use floodgate_core::{Handler, MemoryEngine, NodeState};
//! use floodgate_pubsub::PubSub;
//!
//! let node = Arc::new(NodeState::new());
//! let engine = Arc::new(MemoryEngine::new("local"));
//! let pubsub = PubSub::new(node.clone(), engine);
//!
//! node.mark_started();
//!
//! let handler = Handler::new(|msg| println!("got {} bytes", msg.data.len()));
//! pubsub.subscribe(("news", handler.clone())).await?;
//! pubsub.publish("news", b"hello".to_vec()).await?;
//!
//! assert_eq!(pubsub.ls().await?, vec!["news".into()]);
//!
//! pubsub.unsubscribe(("news", handler)).await?;
//! ```

pub mod adapter;
pub mod error;
pub mod request;

// Re-exports
pub use adapter::{Callback, PubSub};
pub use error::{PubSubError, PubSubResult};
pub use request::{PeersQuery, PublishData, SubscribeOptions, SubscribeRequest, UnsubscribeRequest};
