//! `!song` / `!nowplaying`: show what the music player is playing.

use async_trait::async_trait;
use zergling_core::Result;

use crate::context::ActionContext;
use crate::registry::{Command, CommandAction, CommandArgs, CommandRegistry, TriggerSet};

pub struct Song;

pub fn command() -> Command {
    Command::new("song", TriggerSet::words(&["song", "nowplaying"]), Song)
        .help("Shows the song that's currently playing.")
}

#[async_trait]
impl CommandAction for Song {
    async fn execute(
        &self,
        ctx: &ActionContext,
        _args: &CommandArgs,
        _config: &toml::Value,
        _commands: &CommandRegistry,
        _trigger: &str,
    ) -> Result<()> {
        let playing = ctx
            .stream
            .np_data
            .now_playing()
            .await
            .filter(|np| np.is_currently_playing && !np.song.trim().is_empty());
        match playing {
            Some(np) => ctx.reply(&format!("Now playing: {}", song_title(&np.song)), true).await,
            None => ctx.reply("Not currently playing a song.", true).await,
        }
    }
}

/// Display title for a song path: the file name without its extension.
/// Handles both `/` and `\` separators.
pub fn song_title(path: &str) -> &str {
    let path = path.trim();
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file,
    }
}
