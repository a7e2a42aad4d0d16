//! # Floodgate Node
//!
//! Runnable Floodgate node: an iroh endpoint, the gossip engine, and the
//! pub/sub adapter wired together.
//!
//! The node owns the started flag the adapter checks before every
//! operation, so nothing can be subscribed or published until
//! [`FloodNode::start`] has run.
//!
//! ## Example
//!
//! ```rust,ignore
//! use floodgate_core::Handler;
//! use floodgate_node::{FloodNode, NodeConfig};
//!
//! let node = FloodNode::new(NodeConfig::default()).await?;
//! node.start().await?;
//!
//! let handler = Handler::new(|msg| println!("{:?}", msg.data));
//! node.pubsub().subscribe(("news", handler)).await?;
//! node.pubsub().publish("news", b"hello".to_vec()).await?;
//!
//! node.stop().await?;
//! ```

pub mod config;
pub mod error;

pub use config::NodeConfig;
pub use error::{NodeError, NodeResult};

use std::sync::Arc;

use floodgate_core::{NodeState, NodeStatus};
use floodgate_gossip::{GOSSIP_ALPN, GossipEngine, GossipEngineBuilder};
use floodgate_pubsub::PubSub;
use iroh::protocol::Router;
use iroh::{Endpoint, EndpointAddr, EndpointId, SecretKey};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// Adapter type exposed by a node
pub type NodePubSub = PubSub<GossipEngine, NodeState>;

/// A Floodgate node
///
/// Created stopped. [`start`](Self::start) registers the gossip protocol
/// with the endpoint's router; [`stop`](Self::stop) leaves every topic and
/// closes the endpoint, after which the node cannot be started again.
pub struct FloodNode {
    /// Node configuration
    config: NodeConfig,
    /// Bound iroh endpoint
    endpoint: Endpoint,
    /// Gossip engine shared with the adapter
    engine: Arc<GossipEngine>,
    /// Started flag shared with the adapter
    state: Arc<NodeState>,
    /// Subscription adapter
    pubsub: NodePubSub,
    /// Protocol router (None until started)
    router: Mutex<Option<Router>>,
}

impl FloodNode {
    /// Create a new node
    ///
    /// Binds the endpoint and builds the engine. Call
    /// [`start`](Self::start) to begin accepting gossip connections.
    #[instrument(skip(config), fields(bootstrap = config.bootstrap.len()))]
    pub async fn new(config: NodeConfig) -> NodeResult<Self> {
        let secret_key = match config.parse_secret_key()? {
            Some(key) => key,
            None => SecretKey::generate(&mut rand::rng()),
        };
        let bootstrap = config.parse_bootstrap()?;

        let endpoint = Endpoint::builder()
            .secret_key(secret_key.clone())
            .bind()
            .await
            .map_err(|e| NodeError::Transport(e.to_string()))?;

        let engine = GossipEngineBuilder::new()
            .secret_key(secret_key)
            .bootstrap(bootstrap)
            .max_listeners(config.max_listeners)
            .build(&endpoint);
        let engine = Arc::new(engine);
        let state = Arc::new(NodeState::new());
        let pubsub = PubSub::new(state.clone(), engine.clone());

        info!(endpoint = %endpoint.id(), "Node created");

        Ok(Self {
            config,
            endpoint,
            engine,
            state,
            pubsub,
            router: Mutex::new(None),
        })
    }

    /// Start the node
    #[instrument(skip(self), fields(endpoint = %self.endpoint.id()))]
    pub async fn start(&self) -> NodeResult<()> {
        if self.endpoint.is_closed() {
            return Err(NodeError::Closed);
        }
        if self.state.mark_started() {
            return Err(NodeError::AlreadyStarted);
        }

        let router = Router::builder(self.endpoint.clone())
            .accept(GOSSIP_ALPN, self.engine.gossip().clone())
            .spawn();
        *self.router.lock().await = Some(router);

        self.engine.start();

        info!("Node started");
        Ok(())
    }

    /// Stop the node
    #[instrument(skip(self), fields(endpoint = %self.endpoint.id()))]
    pub async fn stop(&self) -> NodeResult<()> {
        if !self.state.mark_stopped() {
            return Ok(()); // Already stopped
        }

        self.engine.stop();

        // Shutting the router down also closes the endpoint
        if let Some(router) = self.router.lock().await.take() {
            if let Err(e) = router.shutdown().await {
                warn!(error = %e, "Router shutdown error");
            }
        }

        info!("Node stopped");
        Ok(())
    }

    /// Check if the node is started
    pub fn is_started(&self) -> bool {
        self.state.is_started()
    }

    /// Get our endpoint ID
    pub fn endpoint_id(&self) -> EndpointId {
        self.endpoint.id()
    }

    /// Get the endpoint's address for sharing with peers
    pub fn endpoint_addr(&self) -> EndpointAddr {
        self.endpoint.addr()
    }

    /// The subscription adapter
    pub fn pubsub(&self) -> &NodePubSub {
        &self.pubsub
    }

    /// The gossip engine
    pub fn engine(&self) -> &Arc<GossipEngine> {
        &self.engine
    }

    /// Node configuration
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }
}
