//! Shared event bus.
//!
//! Widgets and realms talk over one broadcast channel: widgets publish
//! `requestData`/`storeData`, realms publish `broadcastData`. Every
//! subscriber sees every message and filters on `realm`.

use tokio::sync::broadcast;
use zergling_core::BusMessage;

const BUS_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BusMessage>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender: tx }
    }

    /// Publish a message to every current subscriber.
    /// Returns how many subscribers received it (0 when nobody listens).
    pub fn publish(&self, message: BusMessage) -> usize {
        tracing::debug!(realm = %message.realm, action = ?message.action, "bus publish");
        self.sender.send(message).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
