//! Realm registry: owns every realm and its bus listener.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use zergling_core::{ForceMode, Result, ZerglingError};

use crate::bus::EventBus;
use crate::cached_store::CachedStore;
use crate::listener_broadcaster::ListenerBroadcaster;
use crate::realm::{self, Realm};

struct Entry {
    realm: Arc<dyn Realm>,
    listener: Option<JoinHandle<()>>,
}

/// Registry of named realms sharing one event bus.
///
/// Realm names are unique across both realm kinds; registering a name twice
/// is an error.
pub struct RealmManager {
    bus: EventBus,
    realms: Mutex<HashMap<String, Entry>>,
}

impl RealmManager {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            realms: Mutex::new(HashMap::new()),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Register a read-only realm computed by `fetch`.
    pub fn register_listener_broadcaster<F, Fut>(
        &self,
        name: &str,
        cache_time: Duration,
        fetch: F,
    ) -> Result<Arc<ListenerBroadcaster>>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.ensure_free(name)?;
        let realm = Arc::new(ListenerBroadcaster::new(name, cache_time, self.bus.clone(), fetch));
        self.insert(name, realm.clone())?;
        Ok(realm)
    }

    /// Register a file-backed realm.
    pub fn register_cached_store(
        &self,
        name: &str,
        file_path: PathBuf,
        cache_time: Duration,
    ) -> Result<Arc<CachedStore>> {
        self.ensure_free(name)?;
        let realm = Arc::new(CachedStore::new(name, file_path, cache_time, self.bus.clone()));
        self.insert(name, realm.clone())?;
        Ok(realm)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Realm>> {
        self.lock().get(name).map(|entry| entry.realm.clone())
    }

    pub fn realm_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Broadcast one realm's value by name.
    pub async fn broadcast_realm_data(&self, name: &str, force: Option<ForceMode>) -> Result<Value> {
        let realm = self
            .get(name)
            .ok_or_else(|| ZerglingError::UnknownRealm(name.to_string()))?;
        Ok(realm.broadcast_data(force).await)
    }

    /// Start a bus listener for every realm that does not have one yet.
    /// Calling this again only picks up realms registered since.
    pub fn start_listeners(&self) -> usize {
        let mut realms = self.lock();
        let mut started = 0;
        for (name, entry) in realms.iter_mut() {
            if entry.listener.is_none() {
                entry.listener = Some(realm::spawn_listener(entry.realm.clone(), &self.bus));
                tracing::debug!(realm = %name, "👂 Realm listener started");
                started += 1;
            }
        }
        started
    }

    /// Abort every listener task.
    pub fn stop_listeners(&self) {
        for entry in self.lock().values_mut() {
            if let Some(handle) = entry.listener.take() {
                handle.abort();
            }
        }
    }

    fn ensure_free(&self, name: &str) -> Result<()> {
        if self.lock().contains_key(name) {
            return Err(ZerglingError::DuplicateRealm(name.to_string()));
        }
        Ok(())
    }

    fn insert(&self, name: &str, realm: Arc<dyn Realm>) -> Result<()> {
        let mut realms = self.lock();
        if realms.contains_key(name) {
            return Err(ZerglingError::DuplicateRealm(name.to_string()));
        }
        realms.insert(name.to_string(), Entry { realm, listener: None });
        tracing::info!(realm = name, "Registered realm");
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        // A poisoned map is still structurally valid.
        self.realms.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for RealmManager {
    fn drop(&mut self) {
        self.stop_listeners();
    }
}
