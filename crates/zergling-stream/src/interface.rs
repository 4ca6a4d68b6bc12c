//! The stream interface: everything a command handler or periodic task may
//! touch while it runs.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use zergling_core::{
    ChatSink, LadderSource, ObsControl, ProcessProbe, Result, StreamInfoSource, ZerglingConfig,
};

use crate::bus::EventBus;
use crate::manager::RealmManager;
use crate::realms::{ChatterMetadata, NpData, StreamInfo, WebampData};

/// Colours the chat platform accepts for announcements.
pub const ANNOUNCEMENT_COLORS: [&str; 5] = ["blue", "green", "orange", "purple", "primary"];

/// Shared runtime context handed to every handler and task.
///
/// Handlers only mutate what the interface owns explicitly: realm data
/// through the realm handles, and chat through [`StreamInterface::post_to_channel`].
pub struct StreamInterface {
    config: Arc<ZerglingConfig>,
    data_path: PathBuf,
    chat: Arc<dyn ChatSink>,
    obs: Option<Arc<dyn ObsControl>>,
    processes: Option<Arc<dyn ProcessProbe>>,
    ladder: Option<Arc<dyn LadderSource>>,
    realms: RealmManager,
    pub webamp: WebampData,
    pub np_data: NpData,
    pub chatter_metadata: ChatterMetadata,
    /// Present once a [`StreamInfoSource`] is attached.
    pub stream_info: Option<StreamInfo>,
}

impl StreamInterface {
    /// Build the interface and register the bot's realms.
    /// Must be called inside a tokio runtime.
    pub fn new(
        config: Arc<ZerglingConfig>,
        data_path: PathBuf,
        chat: Arc<dyn ChatSink>,
        bus: EventBus,
    ) -> Result<Self> {
        let realms = RealmManager::new(bus);
        let store_window = Duration::from_millis(config.stream.store_cache_ms);
        let broadcast_window = Duration::from_millis(config.stream.broadcast_cache_ms);

        let webamp = WebampData::register(&realms, &data_path, store_window)?;
        let np_data = NpData::register(&realms, &data_path, store_window)?;
        let chatter_metadata = ChatterMetadata::register(&realms, &data_path, broadcast_window)?;

        tracing::info!(
            "📦 Stream interface ready: {} realms in {}",
            realms.realm_names().len(),
            data_path.display()
        );

        Ok(Self {
            config,
            data_path,
            chat,
            obs: None,
            processes: None,
            ladder: None,
            realms,
            webamp,
            np_data,
            chatter_metadata,
            stream_info: None,
        })
    }

    /// Attach an OBS controller.
    pub fn with_obs(mut self, obs: Arc<dyn ObsControl>) -> Self {
        self.obs = Some(obs);
        self
    }

    /// Attach a process table probe (used by the DOSBox capture task).
    pub fn with_processes(mut self, processes: Arc<dyn ProcessProbe>) -> Self {
        self.processes = Some(processes);
        self
    }

    /// Attach a ladder data source (used by the `ladderinfo` task).
    pub fn with_ladder(mut self, ladder: Arc<dyn LadderSource>) -> Self {
        self.ladder = Some(ladder);
        self
    }

    /// Register the `stream_info` realm for the configured broadcaster.
    /// Call before [`StreamInterface::init_listeners`].
    pub fn with_stream_info(mut self, source: Arc<dyn StreamInfoSource>) -> Result<Self> {
        let window = Duration::from_millis(self.config.stream.broadcast_cache_ms);
        let username = self.config.app.broadcaster_username.clone();
        self.stream_info = Some(StreamInfo::register(&self.realms, window, source, &username)?);
        Ok(self)
    }

    pub fn config(&self) -> &ZerglingConfig {
        &self.config
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn chat(&self) -> &Arc<dyn ChatSink> {
        &self.chat
    }

    pub fn obs(&self) -> Option<&Arc<dyn ObsControl>> {
        self.obs.as_ref()
    }

    pub fn processes(&self) -> Option<&Arc<dyn ProcessProbe>> {
        self.processes.as_ref()
    }

    pub fn ladder(&self) -> Option<&Arc<dyn LadderSource>> {
        self.ladder.as_ref()
    }

    pub fn realms(&self) -> &RealmManager {
        &self.realms
    }

    pub fn bus(&self) -> &EventBus {
        self.realms.bus()
    }

    /// Start listening for widget requests on every registered realm.
    pub fn init_listeners(&self) -> usize {
        self.realms.start_listeners()
    }

    /// Post a line to a chat channel (the default channel when `channel_id` is `None`).
    pub async fn post_to_channel(&self, message: &str, quiet: bool, channel_id: Option<&str>) -> Result<()> {
        let channel = self.config.chat.channel_name(channel_id);
        self.chat.say(&channel, message, quiet).await
    }

    /// Post several lines, in order, to one channel.
    pub async fn post_feedback_items<S: AsRef<str>>(
        &self,
        items: &[S],
        quiet: bool,
        channel_id: Option<&str>,
    ) -> Result<()> {
        for item in items {
            self.post_to_channel(item.as_ref(), quiet, channel_id).await?;
        }
        Ok(())
    }

    /// Post an announcement.
    ///
    /// Without a colour this is a plain quiet chat line. `"random"` picks one
    /// of [`ANNOUNCEMENT_COLORS`]; an unknown colour falls back to `primary`.
    pub async fn make_announcement(&self, message: &str, color: Option<&str>) -> Result<()> {
        let Some(color) = color else {
            return self.post_to_channel(message, true, None).await;
        };
        let color = resolve_announcement_color(color);
        let channel = self.config.chat.channel_name(None);
        self.chat.announce(&channel, message, color).await
    }
}

/// Map a requested announcement colour onto a valid one.
pub fn resolve_announcement_color(requested: &str) -> &'static str {
    if requested == "random" {
        return ANNOUNCEMENT_COLORS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("primary");
    }
    match ANNOUNCEMENT_COLORS.iter().find(|c| **c == requested) {
        Some(color) => *color,
        None => {
            tracing::warn!("Invalid announcement color: {requested}");
            "primary"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn interface(dir: &Path) -> (Arc<StreamInterface>, Arc<testing::RecordingSink>) {
        let mut config = ZerglingConfig::default();
        config.chat.default_channel = "123".into();
        config.chat.channels.insert("123".into(), "#dada78641".into());
        testing::interface_with(config, dir, None).unwrap()
    }

    #[tokio::test]
    async fn test_registers_bot_realms() {
        let dir = tempfile::tempdir().unwrap();
        let (iface, _) = interface(dir.path());
        assert_eq!(
            iface.realms().realm_names(),
            vec!["chatter_metadata", "np_data", "webamp_data"]
        );
        assert_eq!(iface.init_listeners(), 3);
    }

    #[tokio::test]
    async fn test_post_to_default_channel_keeps_quiet_flag() {
        let dir = tempfile::tempdir().unwrap();
        let (iface, sink) = interface(dir.path());

        iface.post_to_channel("hello", true, None).await.unwrap();
        iface.post_feedback_items(&["a", "b"], false, Some("#elsewhere")).await.unwrap();

        let lines = sink.lines();
        assert_eq!(lines[0].channel, "#dada78641");
        assert!(lines[0].quiet);
        assert_eq!(lines[1].channel, "#elsewhere");
        assert_eq!(lines[2].message, "b");
    }

    #[tokio::test]
    async fn test_announcement_colors() {
        let dir = tempfile::tempdir().unwrap();
        let (iface, sink) = interface(dir.path());

        iface.make_announcement("plain", None).await.unwrap();
        iface.make_announcement("blue", Some("blue")).await.unwrap();
        iface.make_announcement("bogus", Some("chartreuse")).await.unwrap();

        let lines = sink.lines();
        assert_eq!(lines[0].color, None);
        assert!(lines[0].quiet);
        assert_eq!(lines[1].color.as_deref(), Some("blue"));
        assert_eq!(lines[2].color.as_deref(), Some("primary"));
    }

    #[test]
    fn test_random_color_is_valid() {
        for _ in 0..20 {
            assert!(ANNOUNCEMENT_COLORS.contains(&resolve_announcement_color("random")));
        }
    }
}
