//! Message handlers

use std::fmt;
use std::sync::Arc;

use crate::message::Message;

/// A message callback attached to a topic
///
/// Handlers are compared by identity: clones of one handler are equal,
/// while two handlers built from separate closures are not, even if the
/// closures are identical. Keep a clone of the handler you subscribed
/// with in order to unsubscribe it later.
#[derive(Clone)]
pub struct Handler(Arc<dyn Fn(&Message) + Send + Sync>);

impl Handler {
    /// Wrap a closure as a handler
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the handler with a message
    pub fn call(&self, message: &Message) {
        (self.0)(message)
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for Handler {}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({:p})", self.addr())
    }
}
