//! Zergling configuration system.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, ZerglingError};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZerglingConfig {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub twitch: TwitchConfig,
    /// Per-command config slices, keyed by command/redemption name.
    #[serde(default)]
    pub actions: HashMap<String, toml::Value>,
    /// Per-task config slices, keyed by task name.
    #[serde(default)]
    pub tasks: HashMap<String, toml::Value>,
}

impl Default for ZerglingConfig {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            chat: ChatConfig::default(),
            stream: StreamConfig::default(),
            scheduler: SchedulerConfig::default(),
            gateway: GatewayConfig::default(),
            discord: DiscordConfig::default(),
            twitch: TwitchConfig::default(),
            actions: HashMap::new(),
            tasks: HashMap::new(),
        }
    }
}

impl ZerglingConfig {
    /// Load config from the default path (~/.config/zergling/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ZerglingError::Config(format!("Failed to read config: {e}")))?;
        let config = Self::parse(&content)?;
        tracing::info!(
            "📄 Loaded config from {} ({} action slice(s), {} task slice(s))",
            path.display(),
            config.actions.len(),
            config.tasks.len()
        );
        Ok(config)
    }

    /// Parse config from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ZerglingError::Config(format!("Failed to parse config: {e}")))
    }

    /// Config slice for one command or redemption. Missing = empty table.
    pub fn action_config(&self, name: &str) -> toml::Value {
        self.actions.get(name).cloned().unwrap_or_else(empty_table)
    }

    /// Config slice for one periodic task. Missing = empty table.
    pub fn task_config(&self, name: &str) -> toml::Value {
        self.tasks.get(name).cloned().unwrap_or_else(empty_table)
    }

    /// Get the default config directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("zergling")
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Directory holding realm files (CachedStore documents).
    pub fn data_dir(&self) -> PathBuf {
        expand_path(&self.stream.data_dir)
    }
}

/// An empty TOML table, the default for any config slice.
pub fn empty_table() -> toml::Value {
    toml::Value::Table(toml::map::Map::new())
}

/// Expand a leading `~` in a configured path.
pub fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

/// Identity of the broadcaster and bot accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bot_username")]
    pub bot_username: String,
    #[serde(default)]
    pub broadcaster_username: String,
}

fn default_bot_username() -> String { "zerglingbot".into() }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bot_username: default_bot_username(),
            broadcaster_username: String::new(),
        }
    }
}

/// Chat configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Nickname the bot chats as; its own lines are ignored.
    #[serde(default = "default_bot_username")]
    pub nickname: String,
    /// Channel ID → channel name.
    #[serde(default)]
    pub channels: HashMap<String, String>,
    /// Channel ID used when a post does not name one.
    #[serde(default = "default_channel_id")]
    pub default_channel: String,
    /// Prefix that marks a chat line as a command.
    #[serde(default = "default_cmd_char")]
    pub cmd_char: String,
}

fn default_channel_id() -> String { "main".into() }
fn default_cmd_char() -> String { "!".into() }

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            nickname: default_bot_username(),
            channels: HashMap::new(),
            default_channel: default_channel_id(),
            cmd_char: default_cmd_char(),
        }
    }
}

impl ChatConfig {
    /// Resolve a channel ID (or the default channel) to a channel name.
    /// Unknown IDs are used as the channel name verbatim.
    pub fn channel_name(&self, channel_id: Option<&str>) -> String {
        let id = channel_id.unwrap_or(&self.default_channel);
        self.channels.get(id).cloned().unwrap_or_else(|| id.to_string())
    }
}

/// Realm storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Cache window for disk-backed stores.
    #[serde(default = "default_store_cache_ms")]
    pub store_cache_ms: u64,
    /// Cache window for live-computed broadcasters.
    #[serde(default = "default_broadcast_cache_ms")]
    pub broadcast_cache_ms: u64,
}

fn default_data_dir() -> String { "~/.cache/zergling/data".into() }
fn default_store_cache_ms() -> u64 { 2500 }
fn default_broadcast_cache_ms() -> u64 { 30000 }

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            store_cache_ms: default_store_cache_ms(),
            broadcast_cache_ms: default_broadcast_cache_ms(),
        }
    }
}

/// Periodic task scheduler configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Upper bound for one tick; unset = unbounded.
    #[serde(default)]
    pub tick_timeout_ms: Option<u64>,
    /// Stop a task's loop when it reports a lost connection.
    #[serde(default)]
    pub exit_on_disconnect: bool,
    /// Task names that should not be started.
    #[serde(default)]
    pub disabled: Vec<String>,
}

/// Widget gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

fn bool_true() -> bool { true }
fn default_port() -> u16 { 4460 }
fn default_host() -> String { "127.0.0.1".into() }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Discord notification configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Twitch API credentials for the `stream_info` realm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitchConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_helix_url")]
    pub api_url: String,
}

fn default_helix_url() -> String { "https://api.twitch.tv/helix".into() }

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            access_token: None,
            api_url: default_helix_url(),
        }
    }
}

impl TwitchConfig {
    /// `(client_id, access_token)` when both are set and non-blank.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let client_id = self.client_id.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let token = self.access_token.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((client_id, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ZerglingConfig::default();
        assert_eq!(config.chat.cmd_char, "!");
        assert_eq!(config.stream.store_cache_ms, 2500);
        assert_eq!(config.stream.broadcast_cache_ms, 30000);
        assert!(config.gateway.enabled);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r##"
            [chat]
            nickname = "botling"
            default_channel = "123"
            channels = { "123" = "#dada78641" }

            [actions.discord]
            invite_link = "https://discord.gg/xyz"

            [tasks.winampnp]
            data_path = "/tmp/winamp"
        "##;

        let config = ZerglingConfig::parse(toml_str).unwrap();
        assert_eq!(config.chat.nickname, "botling");
        assert_eq!(config.chat.channel_name(None), "#dada78641");
        assert_eq!(
            config.action_config("discord")["invite_link"].as_str(),
            Some("https://discord.gg/xyz")
        );
        assert_eq!(config.task_config("winampnp")["data_path"].as_str(), Some("/tmp/winamp"));
    }

    #[test]
    fn test_missing_slices_are_empty_tables() {
        let config = ZerglingConfig::parse("").unwrap();
        assert_eq!(config.task_config("nope"), empty_table());
        assert_eq!(config.action_config("nope"), empty_table());
        assert_eq!(config.gateway.port, 4460);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = ZerglingConfig::parse("[chat").unwrap_err();
        assert!(matches!(err, ZerglingError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[chat]\ncmd_char = \"?\"\n\n[tasks.winampnp]\ndata_path = \"~/np\"\n").unwrap();

        let config = ZerglingConfig::load_from(&path).unwrap();
        assert_eq!(config.chat.cmd_char, "?");
        assert_eq!(config.tasks.len(), 1);

        let err = ZerglingConfig::load_from(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }

    #[test]
    fn test_twitch_credentials_need_both_fields() {
        let config = ZerglingConfig::parse("[twitch]\nclient_id = \"abc\"\n").unwrap();
        assert_eq!(config.twitch.credentials(), None);
        assert_eq!(config.twitch.api_url, "https://api.twitch.tv/helix");

        let config =
            ZerglingConfig::parse("[twitch]\nclient_id = \"abc\"\naccess_token = \"tok\"\n").unwrap();
        assert_eq!(config.twitch.credentials(), Some(("abc", "tok")));
    }

    #[test]
    fn test_unknown_channel_id_is_used_verbatim() {
        let chat = ChatConfig::default();
        assert_eq!(chat.channel_name(Some("#other")), "#other");
    }
}
