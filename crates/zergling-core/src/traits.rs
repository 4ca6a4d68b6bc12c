//! Traits for the vendor clients the bot talks through.
//!
//! Real deployments back these with Twitch/OBS SDK clients; the console
//! channel, the HTTP sources in `zergling-channels` and the tests provide
//! their own implementations.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Outbound chat: "given a channel name and a string, send a chat message".
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Send a line to a channel. `quiet` marks the line as bot feedback that
    /// stream overlays should not render; the encoding is up to the sink.
    async fn say(&self, channel: &str, message: &str, quiet: bool) -> Result<()>;

    /// Post a highlighted announcement. Sinks without announcement support
    /// fall back to a regular line.
    async fn announce(&self, channel: &str, message: &str, color: &str) -> Result<()> {
        let _ = color;
        self.say(channel, message, false).await
    }
}

/// The slice of OBS the bot's periodic tasks need.
#[async_trait]
pub trait ObsControl: Send + Sync {
    /// Whether the websocket to OBS is currently up.
    fn is_connected(&self) -> bool;

    /// Whether the webcam source is currently producing an image.
    async fn is_webcam_active(&self) -> Result<bool>;

    /// Whether the webcam is being tested (forces the frame on).
    async fn is_webcam_testing(&self) -> Result<bool> {
        Ok(false)
    }

    /// Show or hide the decorative frame around the webcam.
    async fn set_webcam_frame(&self, visible: bool) -> Result<()>;

    /// Point the DOSBox screen capture at the running emulator and enable
    /// only the source filters labelled for `machine`.
    async fn capture_dosbox(&self, machine: &str) -> Result<()>;
}

/// A running DOSBox-X process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DosboxInstance {
    pub pid: u32,
    pub command: String,
}

/// Process table lookups for the DOSBox capture task.
#[async_trait]
pub trait ProcessProbe: Send + Sync {
    /// The most recently started DOSBox-X process, if one is running.
    async fn dosbox_instance(&self) -> Result<Option<DosboxInstance>>;

    /// Name of the machine an instance is emulating. `None` while it can't be
    /// determined yet; the caller retries on its next tick.
    async fn dosbox_machine(&self, instance: &DosboxInstance) -> Result<Option<String>>;
}

/// Result of one ladder lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LadderStatus {
    /// The game (and with it the ladder API) is not running.
    NotRunning,
    /// The player's profile document: `activeProfile`, `profiles`, account fields.
    Profile(Value),
}

/// Where the `ladderinfo` task gets player data from.
#[async_trait]
pub trait LadderSource: Send + Sync {
    async fn player_profiles(&self, player_id: &str, region: &str) -> Result<LadderStatus>;
}

/// Channel metadata for the `stream_info` realm.
#[async_trait]
pub trait StreamInfoSource: Send + Sync {
    /// `{"user": {...}, "stream": {...}}` for a channel. `stream` is null
    /// while the channel is offline.
    async fn stream_info(&self, username: &str) -> Result<Value>;
}
