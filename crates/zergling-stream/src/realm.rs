//! The realm abstraction shared by both realm kinds, and the bus listener.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use zergling_core::{BusAction, BusMessage, ForceMode, Result};

use crate::bus::EventBus;

/// A named data domain that widgets can request and that publishes its
/// value on the bus.
#[async_trait]
pub trait Realm: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Current value (cached per the realm's window). `Value::Null` when the
    /// realm has never produced a value.
    async fn get_data(&self, force: Option<ForceMode>) -> Value;

    /// Publish the current value as a `broadcastData` message.
    /// Returns the payload that was published.
    async fn broadcast_data(&self, force: Option<ForceMode>) -> Value;

    /// Queue the write a message asks for, if any, and return its completion.
    ///
    /// Called from the listener loop before anything is spawned, so writes
    /// are queued in bus arrival order. Messages that return `None` go to
    /// [`Realm::handle_message`] instead.
    fn queue_write(&self, message: &BusMessage) -> Option<BoxFuture<'static, Result<Value>>> {
        let _ = message;
        None
    }

    /// React to one inbound bus message addressed to this realm.
    async fn handle_message(&self, message: BusMessage) -> Result<()> {
        if message.action == BusAction::RequestData {
            self.broadcast_data(None).await;
        }
        Ok(())
    }
}

/// Publish a realm's value to the bus.
pub(crate) fn publish(bus: &EventBus, realm: &str, payload: Value) {
    let receivers = bus.publish(BusMessage::broadcast(realm, payload));
    tracing::debug!(realm, receivers, "📡 Broadcast realm data");
}

/// Subscribe a realm to the bus and spawn its listener loop.
///
/// The subscription is taken before this returns, so messages published
/// afterwards are never missed. Each addressed message is handled on its own
/// task and the listener itself never blocks on a handler. Writes are queued
/// on the loop first, so a realm's stores keep their arrival order.
pub fn spawn_listener(realm: Arc<dyn Realm>, bus: &EventBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    if message.realm != realm.name() || message.action == BusAction::BroadcastData {
                        continue;
                    }
                    if let Some(write) = realm.queue_write(&message) {
                        let name = realm.name().to_string();
                        tokio::spawn(async move {
                            if let Err(e) = write.await {
                                tracing::warn!(realm = %name, "⚠️ Realm write failed: {e}");
                            }
                        });
                        continue;
                    }
                    let realm = realm.clone();
                    tokio::spawn(async move {
                        if let Err(e) = realm.handle_message(message).await {
                            tracing::warn!(realm = realm.name(), "⚠️ Realm message failed: {e}");
                        }
                    });
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(realm = realm.name(), skipped, "Realm listener lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!(realm = realm.name(), "Realm listener stopped");
    })
}
