//! Read/write realm backed by a JSON file.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use zergling_core::{BusAction, BusMessage, ForceMode, Result};

use crate::bus::EventBus;
use crate::cache::Cache;
use crate::document::{self, JsonDocument};
use crate::realm::{self, Realm};

/// A realm persisted to one JSON file.
///
/// Reads go through a [`Cache`] over the file. Writes are queued on the
/// document's single writer and prime the cache with what was written, so
/// a read right after a store sees the stored value without touching disk.
pub struct CachedStore {
    realm: String,
    cache: Arc<Cache<Value>>,
    document: JsonDocument,
    bus: EventBus,
}

impl CachedStore {
    /// Create the store and spawn its writer. Must be called inside a tokio runtime.
    pub fn new(realm: &str, file_path: PathBuf, cache_time: Duration, bus: EventBus) -> Self {
        let read_path = file_path.clone();
        let cache = Arc::new(Cache::new(realm, cache_time, move || {
            let path = read_path.clone();
            async move { document::read_json(&path).await }
        }));
        let document = JsonDocument::open_with_cache(file_path, Some(cache.clone()));
        Self {
            realm: realm.to_string(),
            cache,
            document,
            bus,
        }
    }

    pub fn file_path(&self) -> &Path {
        self.document.path()
    }

    pub fn cache(&self) -> &Cache<Value> {
        &self.cache
    }

    /// Persist `payload`.
    ///
    /// With `overwrite` the payload is shallow-merged into the current file
    /// contents; without it the file is replaced by the payload. The write is
    /// queued when this is called, so stores apply in call order. Does not
    /// broadcast.
    pub fn store_data(
        &self,
        payload: Value,
        overwrite: bool,
    ) -> impl Future<Output = Result<Value>> + Send + 'static {
        let write = if overwrite {
            self.document
                .update(move |current| document::shallow_merge(current, payload))
                .boxed()
        } else {
            self.document.replace(payload).boxed()
        };
        let realm = self.realm.clone();
        async move {
            let written = write.await?;
            tracing::debug!(realm = %realm, overwrite, "Stored realm data");
            Ok(written)
        }
    }
}

impl std::fmt::Debug for CachedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedStore")
            .field("realm", &self.realm)
            .field("file_path", &self.document.path())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Realm for CachedStore {
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

    fn queue_write(&self, message: &BusMessage) -> Option<BoxFuture<'static, Result<Value>>> {
        if message.action != BusAction::StoreData {
            return None;
        }
        let payload = message.payload.clone().unwrap_or(Value::Null);
        Some(self.store_data(payload, message.overwrite.unwrap_or(true)).boxed())
    }

    async fn handle_message(&self, message: BusMessage) -> Result<()> {
        match message.action {
            BusAction::RequestData => {
                self.broadcast_data(None).await;
            }
            BusAction::StoreData => {
                if let Some(write) = self.queue_write(&message) {
                    write.await?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}
