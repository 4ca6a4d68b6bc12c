//! Read-only realm whose value is computed by a fetch function.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use zergling_core::{ForceMode, Result};

use crate::bus::EventBus;
use crate::cache::Cache;
use crate::realm::{self, Realm};

/// A realm that answers `requestData` with the (cached) result of a fetch.
pub struct ListenerBroadcaster {
    realm: String,
    cache: Cache<Value>,
    bus: EventBus,
}

impl ListenerBroadcaster {
    pub fn new<F, Fut>(realm: &str, cache_time: Duration, bus: EventBus, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            realm: realm.to_string(),
            cache: Cache::new(realm, cache_time, fetch),
            bus,
        }
    }

    pub fn cache(&self) -> &Cache<Value> {
        &self.cache
    }
}

impl std::fmt::Debug for ListenerBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerBroadcaster")
            .field("realm", &self.realm)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Realm for ListenerBroadcaster {
    fn name(&self) -> &str {
        &self.realm
    }

    async fn get_data(&self, force: Option<ForceMode>) -> Value {
        self.cache.get(force).await.unwrap_or(Value::Null)
    }

    async fn broadcast_data(&self, force: Option<ForceMode>) -> Value {
        let payload = self.get_data(force).await;
        realm::publish(&self.bus, &self.realm, payload.clone());
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use zergling_core::{BusAction, BusMessage};

    fn counter_realm(bus: &EventBus) -> (Arc<ListenerBroadcaster>, Arc<AtomicU64>) {
        let calls = Arc::new(AtomicU64::new(0));
        let c = calls.clone();
        let realm = ListenerBroadcaster::new("counter", Duration::from_secs(30), bus.clone(), move || {
            let c = c.clone();
            async move { Ok(serde_json::json!({ "n": c.fetch_add(1, Ordering::SeqCst) + 1 })) }
        });
        (Arc::new(realm), calls)
    }

    #[tokio::test]
    async fn test_request_data_is_answered_with_broadcast() {
        let bus = EventBus::new();
        let (lb, _) = counter_realm(&bus);
        let mut rx = bus.subscribe();
        let _listener = realm::spawn_listener(lb.clone(), &bus);

        bus.publish(BusMessage::request("counter"));

        // First message back is our own request, then the answer.
        loop {
            let msg = rx.recv().await.unwrap();
            if msg.action == BusAction::BroadcastData {
                assert_eq!(msg.realm, "counter");
                assert_eq!(msg.payload, Some(serde_json::json!({"n": 1})));
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_other_realms_are_ignored() {
        let bus = EventBus::new();
        let (lb, calls) = counter_realm(&bus);
        let _listener = realm::spawn_listener(lb.clone(), &bus);

        bus.publish(BusMessage::request("someone_else"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_broadcast_uses_cache_window() {
        let bus = EventBus::new();
        let (lb, calls) = counter_realm(&bus);

        lb.broadcast_data(None).await;
        lb.broadcast_data(None).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let fresh = lb.broadcast_data(Some(ForceMode::Fresh)).await;
        assert_eq!(fresh, serde_json::json!({"n": 2}));
    }
}
