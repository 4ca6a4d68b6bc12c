//! HTTP source for the `ladderinfo` task.
//!
//! `[tasks.ladderinfo] api_url` points at a service that serves a player's
//! profile document at `{api_url}/{region}/{player_id}`. A refused connection
//! means the game is not running.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use zergling_core::{LadderSource, LadderStatus, Result, ZerglingError};

pub struct HttpLadderSource {
    api_url: String,
    client: reqwest::Client,
}

impl HttpLadderSource {
    pub fn new(api_url: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// A source when the task config names an `api_url`.
    pub fn from_task_config(config: &toml::Value) -> Option<Self> {
        config
            .get("api_url")
            .and_then(toml::Value::as_str)
            .filter(|url| !url.trim().is_empty())
            .map(Self::new)
    }
}

#[async_trait]
impl LadderSource for HttpLadderSource {
    async fn player_profiles(&self, player_id: &str, region: &str) -> Result<LadderStatus> {
        let url = format!("{}/{region}/{player_id}", self.api_url);
        let resp = match self.client.get(&url).timeout(Duration::from_secs(5)).send().await {
            Ok(resp) => resp,
            Err(e) if e.is_connect() => return Ok(LadderStatus::NotRunning),
            Err(e) => return Err(ZerglingError::NotConnected(format!("ladder: {e}"))),
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ZerglingError::Channel(format!("Ladder API error {status}: {body}")));
        }
        let data: Value = resp
            .json()
            .await
            .map_err(|e| ZerglingError::Channel(format!("Ladder API returned bad JSON: {e}")))?;
        Ok(LadderStatus::Profile(data))
    }
}
