//! The bot's concrete realms.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use zergling_core::{ForceMode, Result, StreamInfoSource};

use crate::cached_store::CachedStore;
use crate::document::{self, JsonDocument};
use crate::listener_broadcaster::ListenerBroadcaster;
use crate::manager::RealmManager;
use crate::realm::Realm;

/// Webamp overlay state. Holds the current skin filename under `skinfn`.
pub struct WebampData {
    store: Arc<CachedStore>,
}

impl WebampData {
    pub const REALM: &'static str = "webamp_data";

    pub fn register(manager: &RealmManager, data_dir: &Path, cache_time: Duration) -> Result<Self> {
        let store = manager.register_cached_store(
            Self::REALM,
            data_dir.join(format!("{}.json", Self::REALM)),
            cache_time,
        )?;
        Ok(Self { store })
    }

    pub fn store(&self) -> &Arc<CachedStore> {
        &self.store
    }

    pub async fn current_skin(&self) -> Option<String> {
        let data = self.store.get_data(None).await;
        data.get("skinfn").and_then(Value::as_str).map(str::to_string)
    }

    pub async fn set_skin(&self, skinfn: &str) -> Result<()> {
        self.store.store_data(json!({ "skinfn": skinfn }), true).await?;
        Ok(())
    }

    /// Broadcast the cached value; a preceding `set_skin` has already primed it.
    pub async fn broadcast(&self) -> Value {
        self.store.broadcast_data(Some(ForceMode::Cache)).await
    }
}

/// What the music player is doing, as stored in `np_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    pub is_currently_playing: bool,
    #[serde(default)]
    pub song: String,
    #[serde(default)]
    pub updated: Option<String>,
}

/// Now-playing realm, written by the `winampnp` task.
pub struct NpData {
    store: Arc<CachedStore>,
}

impl NpData {
    pub const REALM: &'static str = "np_data";

    pub fn register(manager: &RealmManager, data_dir: &Path, cache_time: Duration) -> Result<Self> {
        let store = manager.register_cached_store(
            Self::REALM,
            data_dir.join(format!("{}.json", Self::REALM)),
            cache_time,
        )?;
        Ok(Self { store })
    }

    pub fn store(&self) -> &Arc<CachedStore> {
        &self.store
    }

    /// Current now-playing state, or `None` when nothing was ever stored.
    pub async fn now_playing(&self) -> Option<NowPlaying> {
        serde_json::from_value(self.store.get_data(None).await).ok()
    }

    pub async fn set_now_playing(&self, now_playing: &NowPlaying) -> Result<()> {
        self.store
            .store_data(serde_json::to_value(now_playing)?, false)
            .await?;
        Ok(())
    }

    pub async fn broadcast_fresh(&self) -> Value {
        self.store.broadcast_data(Some(ForceMode::Fresh)).await
    }
}

/// Per-chatter metadata (tags such as the chatter's StarCraft race).
///
/// Served as a read-only realm; writes go through their own document writer.
pub struct ChatterMetadata {
    broadcaster: Arc<ListenerBroadcaster>,
    document: JsonDocument,
}

impl ChatterMetadata {
    pub const REALM: &'static str = "chatter_metadata";

    pub fn register(manager: &RealmManager, data_dir: &Path, cache_time: Duration) -> Result<Self> {
        let path = data_dir.join(format!("{}.json", Self::REALM));
        let read_path = path.clone();
        let broadcaster = manager.register_listener_broadcaster(Self::REALM, cache_time, move || {
            let path = read_path.clone();
            async move { document::read_json(&path).await }
        })?;
        Ok(Self {
            broadcaster,
            document: JsonDocument::open(path),
        })
    }

    pub fn broadcaster(&self) -> &Arc<ListenerBroadcaster> {
        &self.broadcaster
    }

    /// Stored metadata for one chatter, read from disk.
    pub async fn get(&self, username: &str) -> Result<Option<Value>> {
        let data = self.document.read().await?;
        Ok(data
            .get("chatterMetadata")
            .and_then(|all| all.get(username))
            .cloned())
    }

    /// Merge `data` into one chatter's metadata and stamp `lastUpdated`.
    pub fn set_chatter_metadata(
        &self,
        username: &str,
        data: Value,
    ) -> impl Future<Output = Result<Value>> + Send + 'static {
        let username = username.to_string();
        self.document
            .update(move |current| merge_chatter_metadata(current, &username, data, Utc::now()))
    }

    /// Broadcast freshly read metadata (the broadcaster's cache predates any write).
    pub async fn broadcast(&self) -> Value {
        self.broadcaster.broadcast_data(Some(ForceMode::Fresh)).await
    }
}

/// Twitch channel and live stream metadata, fetched through a
/// [`StreamInfoSource`] and cached for the broadcast window.
pub struct StreamInfo {
    broadcaster: Arc<ListenerBroadcaster>,
}

impl StreamInfo {
    pub const REALM: &'static str = "stream_info";

    pub fn register(
        manager: &RealmManager,
        cache_time: Duration,
        source: Arc<dyn StreamInfoSource>,
        username: &str,
    ) -> Result<Self> {
        let username = username.to_string();
        let broadcaster = manager.register_listener_broadcaster(Self::REALM, cache_time, move || {
            let source = source.clone();
            let username = username.clone();
            async move { source.stream_info(&username).await }
        })?;
        Ok(Self { broadcaster })
    }

    pub fn broadcaster(&self) -> &Arc<ListenerBroadcaster> {
        &self.broadcaster
    }

    /// Whether the channel is live, per the cached value.
    pub async fn is_live(&self) -> bool {
        let data = self.broadcaster.get_data(None).await;
        data.get("stream").is_some_and(|stream| !stream.is_null())
    }
}

/// Merge one chatter's update into the metadata document.
///
/// Each top-level key of `data` is shallow-merged into the chatter's existing
/// value for that key; a chatter always has a `tags` object.
pub fn merge_chatter_metadata(current: Value, username: &str, data: Value, now: DateTime<Utc>) -> Value {
    let mut root = match current {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let mut all = match root.remove("chatterMetadata") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let mut user = Map::new();
    user.insert("tags".into(), Value::Object(Map::new()));
    if let Some(Value::Object(existing)) = all.remove(username) {
        user.extend(existing);
    }
    if let Value::Object(updates) = data {
        for (key, value) in updates {
            let previous = user.remove(&key).unwrap_or_else(|| Value::Object(Map::new()));
            user.insert(key, document::shallow_merge(previous, value));
        }
    }
    user.insert(
        "lastUpdated".into(),
        Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );

    all.insert(username.to_string(), Value::Object(user));
    root.insert("chatterMetadata".into(), Value::Object(all));
    Value::Object(root)
}
