//! Discord webhook notifier: posts one embed per notice.

use std::time::Duration;

use serde_json::{Value, json};
use zergling_core::{Result, ZerglingError};

/// Embed colour for bot notices.
const NOTICE_COLOR: u32 = 0x00AAFF;

pub struct DiscordNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl DiscordNotifier {
    pub fn new(webhook_url: &str) -> Self {
        Self {
            webhook_url: webhook_url.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// A notifier when `[discord] webhook_url` is set.
    pub fn from_config(config: &zergling_core::config::DiscordConfig) -> Option<Self> {
        config
            .webhook_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .map(Self::new)
    }

    pub async fn notify(&self, title: &str, body: &str) -> Result<()> {
        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&embed_payload(title, body, chrono::Utc::now()))
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| ZerglingError::Channel(format!("Discord send failed: {e}")))?;

        if resp.status().is_success() {
            tracing::info!("✅ Discord notification sent: {title}");
            Ok(())
        } else {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            Err(ZerglingError::Channel(format!("Discord webhook error {status}: {body}")))
        }
    }
}

/// Webhook body with a single embed.
pub fn embed_payload(title: &str, body: &str, at: chrono::DateTime<chrono::Utc>) -> Value {
    json!({
        "embeds": [{
            "title": title,
            "description": body,
            "color": NOTICE_COLOR,
            "footer": {
                "text": format!("zergling • {}", at.format("%H:%M:%S UTC"))
            }
        }]
    })
}
