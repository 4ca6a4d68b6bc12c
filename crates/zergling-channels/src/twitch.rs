//! Twitch Helix lookups behind the `stream_info` realm.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use zergling_core::config::TwitchConfig;
use zergling_core::{Result, StreamInfoSource, ZerglingError};

/// Helix field → realm field for users.
const USER_FIELDS: [(&str, &str); 9] = [
    ("broadcaster_type", "broadcasterType"),
    ("created_at", "creationDate"),
    ("description", "description"),
    ("display_name", "displayName"),
    ("id", "id"),
    ("login", "name"),
    ("offline_image_url", "offlinePlaceholderUrl"),
    ("profile_image_url", "profilePictureUrl"),
    ("type", "type"),
];

/// Helix field → realm field for live streams.
const STREAM_FIELDS: [(&str, &str); 14] = [
    ("game_id", "gameId"),
    ("game_name", "gameName"),
    ("id", "id"),
    ("is_mature", "isMature"),
    ("language", "language"),
    ("started_at", "startDate"),
    ("tags", "tags"),
    ("thumbnail_url", "thumbnailUrl"),
    ("title", "title"),
    ("type", "type"),
    ("user_name", "userDisplayName"),
    ("user_id", "userId"),
    ("user_login", "userName"),
    ("viewer_count", "viewers"),
];

pub struct HelixStreamInfo {
    api_url: String,
    client_id: String,
    access_token: String,
    client: reqwest::Client,
}

impl HelixStreamInfo {
    pub fn new(api_url: &str, client_id: &str, access_token: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            access_token: access_token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// A client when `[twitch]` has credentials.
    pub fn from_config(config: &TwitchConfig) -> Option<Self> {
        let (client_id, token) = config.credentials()?;
        Some(Self::new(&config.api_url, client_id, token))
    }

    /// First entry of a Helix `data` list, or `Value::Null`.
    async fn first(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let resp = self
            .client
            .get(format!("{}/{path}", self.api_url))
            .query(query)
            .header("Client-Id", &self.client_id)
            .bearer_auth(&self.access_token)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| ZerglingError::NotConnected(format!("twitch: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ZerglingError::Channel(format!("Twitch API error {status}: {body}")));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| ZerglingError::Channel(format!("Twitch API returned bad JSON: {e}")))?;
        Ok(body
            .get("data")
            .and_then(|data| data.get(0))
            .cloned()
            .unwrap_or(Value::Null))
    }
}

#[async_trait]
impl StreamInfoSource for HelixStreamInfo {
    async fn stream_info(&self, username: &str) -> Result<Value> {
        let user = self.first("users", &[("login", username)]).await?;
        let Some(user_id) = user.get("id").and_then(Value::as_str) else {
            return Err(ZerglingError::Channel(format!("Twitch user not found: {username}")));
        };
        let stream = self.first("streams", &[("user_id", user_id)]).await?;
        tracing::debug!(live = !stream.is_null(), "📺 Fetched stream info for {username}");
        Ok(json!({
            "user": unpack(&user, &USER_FIELDS),
            "stream": unpack(&stream, &STREAM_FIELDS),
        }))
    }
}

/// Copy the listed Helix fields under their realm names. `Null` stays `Null`.
pub fn unpack(helix: &Value, fields: &[(&str, &str)]) -> Value {
    let Value::Object(source) = helix else {
        return Value::Null;
    };
    let mut out = Map::new();
    for (from, to) in fields {
        if let Some(v) = source.get(*from) {
            out.insert((*to).to_string(), v.clone());
        }
    }
    Value::Object(out)
}
