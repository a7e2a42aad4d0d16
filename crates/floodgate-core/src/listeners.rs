//! Per-topic handler bookkeeping for engine implementations

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::{DashMap, DashSet};
use tracing::warn;

use crate::handler::Handler;
use crate::message::Message;
use crate::topic::Topic;

/// Default number of handlers per topic before a leak warning is logged
pub const DEFAULT_MAX_LISTENERS: usize = 10;

/// Registry of local handlers, keyed by topic
///
/// Handlers for a topic are kept in attach order. A topic with no handlers
/// has no entry at all, so [`topics`](Self::topics) only reports topics
/// that currently have at least one handler.
pub struct ListenerRegistry {
    listeners: DashMap<Topic, Vec<Handler>>,
    /// Warn threshold per topic, 0 disables the warning
    max_listeners: AtomicUsize,
    /// Topics that produced a leak warning since they last had no handlers
    warned: DashSet<Topic>,
}

impl ListenerRegistry {
    /// Create an empty registry with the default listener limit
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
            max_listeners: AtomicUsize::new(DEFAULT_MAX_LISTENERS),
            warned: DashSet::new(),
        }
    }

    /// Attach a handler to a topic
    pub fn add(&self, topic: &Topic, handler: Handler) {
        let count = {
            let mut handlers = self.listeners.entry(topic.clone()).or_default();
            handlers.push(handler);
            handlers.len()
        };

        let max = self.max_listeners.load(Ordering::Relaxed);
        if max > 0 && count > max && self.warned.insert(topic.clone()) {
            warn!(
                topic = %topic,
                count,
                max,
                "Possible handler leak: more listeners than the configured maximum"
            );
        }
    }

    /// Detach one handler from a topic
    ///
    /// Returns `false` if the handler was not attached.
    pub fn remove(&self, topic: &Topic, handler: &Handler) -> bool {
        let mut removed = false;
        if let Some(mut handlers) = self.listeners.get_mut(topic) {
            if let Some(pos) = handlers.iter().position(|h| h == handler) {
                handlers.remove(pos);
                removed = true;
            }
        }
        if self.listeners.remove_if(topic, |_, handlers| handlers.is_empty()).is_some() {
            self.warned.remove(topic);
        }
        removed
    }

    /// Detach every handler from a topic, returning how many were removed
    pub fn remove_all(&self, topic: &Topic) -> usize {
        self.warned.remove(topic);
        self.listeners
            .remove(topic)
            .map(|(_, handlers)| handlers.len())
            .unwrap_or(0)
    }

    /// Number of handlers attached to a topic
    pub fn count(&self, topic: &Topic) -> usize {
        self.listeners.get(topic).map(|h| h.len()).unwrap_or(0)
    }

    /// Topics with at least one handler
    pub fn topics(&self) -> Vec<Topic> {
        self.listeners.iter().map(|r| r.key().clone()).collect()
    }

    /// Deliver a message to every handler of a topic
    ///
    /// Handlers run on a snapshot, so a handler may detach itself (or others)
    /// while the message is being dispatched. Returns the number of handlers
    /// that were invoked.
    pub fn emit(&self, topic: &Topic, message: &Message) -> usize {
        let handlers: Vec<Handler> = self
            .listeners
            .get(topic)
            .map(|h| h.value().clone())
            .unwrap_or_default();

        for handler in &handlers {
            handler.call(message);
        }
        handlers.len()
    }

    /// Set the per-topic warn threshold, returning the previous value
    pub fn set_max_listeners(&self, n: usize) -> usize {
        self.max_listeners.swap(n, Ordering::Relaxed)
    }

    /// Current per-topic warn threshold
    pub fn max_listeners(&self) -> usize {
        self.max_listeners.load(Ordering::Relaxed)
    }

    /// Whether a leak warning has been logged for a topic
    pub fn has_warned(&self, topic: &Topic) -> bool {
        self.warned.contains(topic)
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    fn counting_handler(counter: &Arc<AtomicUsize>) -> Handler {
        let counter = counter.clone();
        Handler::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_add_and_count() {
        let registry = ListenerRegistry::new();
        let topic = Topic::from("news");

        assert_eq!(registry.count(&topic), 0);
        registry.add(&topic, Handler::new(|_| {}));
        registry.add(&topic, Handler::new(|_| {}));
        assert_eq!(registry.count(&topic), 2);
        assert_eq!(registry.topics(), vec![topic]);
    }

    #[test]
    fn test_remove_only_the_given_handler() {
        let registry = ListenerRegistry::new();
        let topic = Topic::from("news");
        let a = Handler::new(|_| {});
        let b = Handler::new(|_| {});

        registry.add(&topic, a.clone());
        registry.add(&topic, b.clone());

        assert!(registry.remove(&topic, &a));
        assert_eq!(registry.count(&topic), 1);
        assert!(!registry.remove(&topic, &a));

        assert!(registry.remove(&topic, &b));
        assert_eq!(registry.count(&topic), 0);
        assert!(registry.topics().is_empty());
    }

    #[test]
    fn test_same_handler_attached_twice_is_removed_once_per_call() {
        let registry = ListenerRegistry::new();
        let topic = Topic::from("news");
        let handler = Handler::new(|_| {});

        registry.add(&topic, handler.clone());
        registry.add(&topic, handler.clone());

        assert!(registry.remove(&topic, &handler));
        assert_eq!(registry.count(&topic), 1);
    }

    #[test]
    fn test_remove_all() {
        let registry = ListenerRegistry::new();
        let topic = Topic::from("news");
        registry.add(&topic, Handler::new(|_| {}));
        registry.add(&topic, Handler::new(|_| {}));

        assert_eq!(registry.remove_all(&topic), 2);
        assert_eq!(registry.count(&topic), 0);
        assert_eq!(registry.remove_all(&topic), 0);
    }

    #[test]
    fn test_emit_reaches_only_topic_handlers() {
        let registry = ListenerRegistry::new();
        let news_calls = Arc::new(AtomicUsize::new(0));
        let sports_calls = Arc::new(AtomicUsize::new(0));

        registry.add(&Topic::from("news"), counting_handler(&news_calls));
        registry.add(&Topic::from("news"), counting_handler(&news_calls));
        registry.add(&Topic::from("sports"), counting_handler(&sports_calls));

        let message = Message::new("A", "news", b"hey".to_vec());
        assert_eq!(registry.emit(&Topic::from("news"), &message), 2);

        assert_eq!(news_calls.load(Ordering::SeqCst), 2);
        assert_eq!(sports_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_handler_can_detach_itself_during_emit() {
        let registry = Arc::new(ListenerRegistry::new());
        let topic = Topic::from("news");
        let calls = Arc::new(AtomicUsize::new(0));

        let slot: Arc<parking_lot::Mutex<Option<Handler>>> = Arc::new(parking_lot::Mutex::new(None));
        let handler = {
            let registry = registry.clone();
            let slot = slot.clone();
            let calls = calls.clone();
            let topic = topic.clone();
            Handler::new(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Some(me) = slot.lock().take() {
                    registry.remove(&topic, &me);
                }
            })
        };
        *slot.lock() = Some(handler.clone());
        registry.add(&topic, handler);

        let message = Message::new("A", "news", b"once".to_vec());
        registry.emit(&topic, &message);
        registry.emit(&topic, &message);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.count(&topic), 0);
    }

    #[test]
    fn test_set_max_listeners_returns_previous() {
        let registry = ListenerRegistry::new();
        assert_eq!(registry.max_listeners(), DEFAULT_MAX_LISTENERS);
        assert_eq!(registry.set_max_listeners(2), DEFAULT_MAX_LISTENERS);
        assert_eq!(registry.set_max_listeners(0), 2);
    }

    #[test]
    fn test_leak_warning_once_per_topic() {
        let registry = ListenerRegistry::new();
        let topic = Topic::from("news");
        registry.set_max_listeners(1);

        registry.add(&topic, Handler::new(|_| {}));
        assert!(!registry.has_warned(&topic));

        registry.add(&topic, Handler::new(|_| {}));
        assert!(registry.has_warned(&topic));

        // Zero disables the limit for topics that have not warned yet
        registry.set_max_listeners(0);
        let other = Topic::from("sports");
        for _ in 0..20 {
            registry.add(&other, Handler::new(|_| {}));
        }
        assert!(!registry.has_warned(&other));
    }

    #[test]
    fn test_leak_warning_rearms_after_topic_drains() {
        let registry = ListenerRegistry::new();
        let topic = Topic::from("news");
        registry.set_max_listeners(1);

        let a = Handler::new(|_| {});
        let b = Handler::new(|_| {});
        registry.add(&topic, a.clone());
        registry.add(&topic, b.clone());
        assert!(registry.has_warned(&topic));

        // Still one handler left, so the warning stays spent
        registry.remove(&topic, &a);
        assert!(registry.has_warned(&topic));

        registry.remove(&topic, &b);
        assert!(!registry.has_warned(&topic));

        registry.add(&topic, Handler::new(|_| {}));
        registry.add(&topic, Handler::new(|_| {}));
        assert!(registry.has_warned(&topic));

        registry.remove_all(&topic);
        assert!(!registry.has_warned(&topic));
    }
}
