use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use courier_types::events::MessageEvent;

const EVENT_BUFFER: usize = 1024;

/// Fan-out point for message events. Constructed once at startup and handed
/// to whoever needs to publish or listen; dropping the last clone closes
/// every subscriber's stream.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<MessageEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    /// Subscribe to message events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<MessageEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish an event. Having nobody listening is not an error.
    pub fn publish(&self, event: MessageEvent) {
        let id = event.message_id();
        match self.inner.broadcast_tx.send(event) {
            Ok(receivers) => debug!("Published event for message {} to {} subscribers", id, receivers),
            Err(_) => debug!("No subscribers for event on message {}", id),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.broadcast_tx.receiver_count()
    }

    /// Consume this handle at shutdown. Subscribers see the stream close once
    /// every other clone is gone too.
    pub fn shutdown(self) {
        info!(
            "Dispatcher shutting down ({} subscribers attached)",
            self.subscriber_count()
        );
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
