//! The subscription adapter

use std::future::Future;
use std::sync::Arc;

use floodgate_core::{NodeStatus, PubSubEngine, Topic};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{PubSubError, PubSubResult};
use crate::request::{PeersQuery, PublishData, SubscribeRequest, UnsubscribeRequest};

/// Completion callback for the callback-style operations
///
/// Errors arrive as `Err`; success as `Ok` with the operation's value.
pub type Callback<T> = Box<dyn FnOnce(PubSubResult<T>) + Send + 'static>;

/// Application-facing pub/sub surface of a node
///
/// Every gated operation first checks that the node or the engine is
/// started. Topic interest is reference counted through the engine's own
/// listener count: the engine subscribes to a topic when its first local
/// handler arrives and unsubscribes when the last one leaves.
///
/// Operations come in two flavours. The `async fn`s return the result
/// directly. The `*_with_callback` variants return immediately and hand the
/// result to a callback from a freshly spawned task, so the callback never
/// runs inside the call that triggered it. The callback variants must be
/// called from within a Tokio runtime.
pub struct PubSub<E, N> {
    /// Pub/sub engine bound to the node
    engine: Arc<E>,
    /// Readiness of the owning node
    node: Arc<N>,
}

impl<E, N> Clone for PubSub<E, N> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            node: self.node.clone(),
        }
    }
}

impl<E, N> PubSub<E, N>
where
    E: PubSubEngine + 'static,
    N: NodeStatus + 'static,
{
    /// Create an adapter over a node and its engine
    ///
    /// Neither has to be started yet.
    pub fn new(node: Arc<N>, engine: Arc<E>) -> Self {
        Self { engine, node }
    }

    /// Get the underlying engine
    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Check if gated operations are currently allowed
    pub fn is_ready(&self) -> bool {
        self.node.is_started() || self.engine.is_started()
    }

    /// Attach a handler to a topic
    ///
    /// Announces interest in the topic first when it has no handlers yet,
    /// so the network-level subscription never exists without a handler
    /// beyond this call.
    pub async fn subscribe(&self, request: impl Into<SubscribeRequest>) -> PubSubResult<()> {
        let SubscribeRequest {
            topic,
            options,
            handler,
        } = request.into();
        self.ensure_started().await?;

        if self.engine.listener_count(&topic) == 0 {
            debug!(topic = %topic, discover = options.discover, "Announcing topic interest");
            self.engine.subscribe(&topic).await?;
        }
        self.engine.add_listener(&topic, handler);
        Ok(())
    }

    /// Detach one handler, or every handler, from a topic
    ///
    /// Retracts interest in the topic once it has no handlers left.
    pub async fn unsubscribe(&self, request: impl Into<UnsubscribeRequest>) -> PubSubResult<()> {
        let UnsubscribeRequest { topic, handler } = request.into();
        self.ensure_started().await?;

        match &handler {
            Some(handler) => self.engine.remove_listener(&topic, handler),
            None => self.engine.remove_all_listeners(&topic),
        }

        if self.engine.listener_count(&topic) == 0 {
            debug!(topic = %topic, "Retracting topic interest");
            self.engine.unsubscribe(&topic).await?;
        }
        Ok(())
    }

    /// Publish a binary payload on a topic
    ///
    /// Non-binary payloads are rejected without reaching the engine. Engine
    /// failures are returned unchanged.
    pub async fn publish(
        &self,
        topic: impl Into<Topic>,
        data: impl Into<PublishData>,
    ) -> PubSubResult<()> {
        let topic = topic.into();
        let data = data.into();
        self.ensure_started().await?;

        let bytes = match data {
            PublishData::Binary(bytes) => bytes,
            other => {
                debug!(topic = %topic, kind = other.kind(), "Rejecting non-binary payload");
                return deferred_err(PubSubError::InvalidArgument(
                    "data must be a Buffer".to_string(),
                ))
                .await;
            }
        };

        self.engine.publish(&topic, bytes).await?;
        Ok(())
    }

    /// Topics this node is subscribed to, in engine order
    pub async fn ls(&self) -> PubSubResult<Vec<Topic>> {
        self.ensure_started().await?;
        Ok(self.engine.subscriptions())
    }

    /// Identities of known peers, optionally only those interested in a topic
    pub async fn peers(&self, query: impl Into<PeersQuery>) -> PubSubResult<Vec<String>> {
        let PeersQuery { topic } = query.into();
        self.ensure_started().await?;

        Ok(self
            .engine
            .peers()
            .into_iter()
            .filter(|peer| topic.as_ref().is_none_or(|t| peer.is_interested_in(t)))
            .map(|peer| peer.id)
            .collect())
    }

    /// Set the engine's per-topic listener limit
    ///
    /// Not gated and not deferred. Returns whatever the engine returns
    /// (the previous limit).
    pub fn set_max_listeners(&self, n: usize) -> usize {
        self.engine.set_max_listeners(n)
    }

    /// Callback form of [`subscribe`](Self::subscribe)
    pub fn subscribe_with_callback(
        &self,
        request: impl Into<SubscribeRequest>,
        callback: Callback<()>,
    ) -> JoinHandle<()> {
        let this = self.clone();
        let request = request.into();
        complete(async move { this.subscribe(request).await }, callback)
    }

    /// Callback form of [`unsubscribe`](Self::unsubscribe)
    ///
    /// With no callback the operation still runs, but nobody is notified.
    pub fn unsubscribe_with_callback(
        &self,
        request: impl Into<UnsubscribeRequest>,
        callback: Option<Callback<()>>,
    ) -> JoinHandle<()> {
        let this = self.clone();
        let request = request.into();
        let operation = async move { this.unsubscribe(request).await };
        match callback {
            Some(callback) => complete(operation, callback),
            None => tokio::spawn(async move {
                if let Err(e) = operation.await {
                    debug!(error = %e, "Detached unsubscribe failed");
                }
            }),
        }
    }

    /// Callback form of [`publish`](Self::publish)
    pub fn publish_with_callback(
        &self,
        topic: impl Into<Topic>,
        data: impl Into<PublishData>,
        callback: Callback<()>,
    ) -> JoinHandle<()> {
        let this = self.clone();
        let topic = topic.into();
        let data = data.into();
        complete(async move { this.publish(topic, data).await }, callback)
    }

    /// Callback form of [`ls`](Self::ls)
    pub fn ls_with_callback(&self, callback: Callback<Vec<Topic>>) -> JoinHandle<()> {
        let this = self.clone();
        complete(async move { this.ls().await }, callback)
    }

    /// Callback form of [`peers`](Self::peers)
    pub fn peers_with_callback(
        &self,
        query: impl Into<PeersQuery>,
        callback: Callback<Vec<String>>,
    ) -> JoinHandle<()> {
        let this = self.clone();
        let query = query.into();
        complete(async move { this.peers(query).await }, callback)
    }

    async fn ensure_started(&self) -> PubSubResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            deferred_err(PubSubError::NotStarted).await
        }
    }
}

/// Fail only after yielding once to the scheduler
async fn deferred_err<T>(error: PubSubError) -> PubSubResult<T> {
    tokio::task::yield_now().await;
    Err(error)
}

/// Run an operation on its own task and hand the result to a callback
fn complete<T, F>(operation: F, callback: Callback<T>) -> JoinHandle<()>
where
    T: Send + 'static,
    F: Future<Output = PubSubResult<T>> + Send + 'static,
{
    tokio::spawn(async move {
        let result = operation.await;
        callback(result);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodgate_core::{Handler, MemoryEngine, NodeState};
    use tokio_test::{assert_pending, assert_ready};

    fn adapter() -> (PubSub<MemoryEngine, NodeState>, Arc<MemoryEngine>, Arc<NodeState>) {
        let node = Arc::new(NodeState::new());
        let engine = Arc::new(MemoryEngine::new("local"));
        (PubSub::new(node.clone(), engine.clone()), engine, node)
    }

    #[test]
    fn test_not_started_failure_is_never_immediate() {
        let (pubsub, _engine, _node) = adapter();

        let mut ls = tokio_test::task::spawn(pubsub.ls());
        assert_pending!(ls.poll());
        assert!(ls.is_woken());
        let result = assert_ready!(ls.poll());
        assert!(matches!(result, Err(PubSubError::NotStarted)));
    }

    #[test]
    fn test_invalid_payload_failure_is_never_immediate() {
        let (pubsub, engine, _node) = adapter();
        engine.start();

        let mut publish = tokio_test::task::spawn(pubsub.publish("news", "not-a-buffer"));
        assert_pending!(publish.poll());
        let result = assert_ready!(publish.poll());
        assert!(matches!(result, Err(PubSubError::InvalidArgument(_))));
    }

    #[test]
    fn test_ready_when_either_node_or_engine_started() {
        let (pubsub, engine, node) = adapter();
        assert!(!pubsub.is_ready());

        node.mark_started();
        assert!(pubsub.is_ready());

        node.mark_stopped();
        engine.start();
        assert!(pubsub.is_ready());
    }

    #[tokio::test]
    async fn test_first_handler_announces_before_attaching() {
        let (pubsub, engine, node) = adapter();
        node.mark_started();

        pubsub
            .subscribe(("news", Handler::new(|_| {})))
            .await
            .unwrap();

        assert_eq!(
            engine.journal(),
            vec![
                floodgate_core::EngineOp::Subscribe(Topic::from("news")),
                floodgate_core::EngineOp::AddListener(Topic::from("news")),
            ]
        );
    }

    #[test]
    fn test_set_max_listeners_is_not_gated() {
        let (pubsub, _engine, _node) = adapter();
        assert_eq!(pubsub.set_max_listeners(3), floodgate_core::DEFAULT_MAX_LISTENERS);
        assert_eq!(pubsub.set_max_listeners(5), 3);
    }
}
