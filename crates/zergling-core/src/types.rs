//! Messages exchanged between the bot's components and with widgets.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Action carried by a bus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BusAction {
    /// Widget asks a realm to broadcast its current value.
    RequestData,
    /// Widget asks a CachedStore realm to persist a payload.
    StoreData,
    /// Realm publishes its value.
    BroadcastData,
    /// Any action this core does not handle (other bus users).
    #[serde(other)]
    Other,
}

/// One message on the shared event bus.
///
/// Wire shape (compatible with existing overlay widgets):
/// `{"realm": "...", "action": "requestData"}`,
/// `{"realm": "...", "action": "storeData", "payload": {...}, "overwrite": true}`,
/// `{"realm": "...", "action": "broadcastData", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub realm: String,
    pub action: BusAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overwrite: Option<bool>,
}

impl BusMessage {
    /// A `requestData` message for a realm.
    pub fn request(realm: &str) -> Self {
        Self {
            realm: realm.to_string(),
            action: BusAction::RequestData,
            payload: None,
            overwrite: None,
        }
    }

    /// A `storeData` message for a realm.
    pub fn store(realm: &str, payload: Value, overwrite: bool) -> Self {
        Self {
            realm: realm.to_string(),
            action: BusAction::StoreData,
            payload: Some(payload),
            overwrite: Some(overwrite),
        }
    }

    /// A `broadcastData` message carrying a realm's value.
    pub fn broadcast(realm: &str, payload: Value) -> Self {
        Self {
            realm: realm.to_string(),
            action: BusAction::BroadcastData,
            payload: Some(payload),
            overwrite: None,
        }
    }
}

/// Override for a cached read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForceMode {
    /// Serve the last known value even if it is stale.
    Cache,
    /// Bypass the cache and fetch again.
    Fresh,
}

/// An incoming chat line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Channel the message was posted in, e.g. `#dada78641`.
    pub channel: String,
    /// Login name of the sender.
    pub user: String,
    /// Display name, when the platform provides one.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Full message text.
    pub text: String,
    /// Whether this line is the chat echo of a channel-point redemption.
    #[serde(default)]
    pub is_redemption: bool,
    #[serde(default)]
    pub is_mod: bool,
    #[serde(default)]
    pub is_broadcaster: bool,
}

impl ChatMessage {
    pub fn new(channel: &str, user: &str, text: &str) -> Self {
        Self {
            channel: channel.to_string(),
            user: user.to_string(),
            display_name: None,
            text: text.to_string(),
            is_redemption: false,
            is_mod: false,
            is_broadcaster: false,
        }
    }
}

/// A channel-point reward redemption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionEvent {
    /// Platform reward UUID (as sent by the platform).
    pub reward_id: String,
    #[serde(default)]
    pub reward_title: String,
    pub user_name: String,
    #[serde(default)]
    pub user_id: String,
    /// Text the viewer entered, for rewards that take input.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reward_cost: u64,
}
