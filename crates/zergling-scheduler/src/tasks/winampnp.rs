//! Now-playing watcher.
//!
//! The music player writes `is_playing.txt` and `song.txt` into
//! `[tasks.winampnp] data_path`. When either file changes, the new state is
//! stored in the `np_data` realm and broadcast to the overlay.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use tokio::sync::Mutex;
use zergling_core::config::expand_path;
use zergling_core::{Result, ZerglingError};
use zergling_stream::NowPlaying;

use crate::engine::{CronTask, TickContext};

pub const NAME: &str = "winampnp";
pub const DELAY_MS: u64 = 250;

const WATCH_FILES: [&str; 2] = ["is_playing.txt", "song.txt"];

/// Remembers the last seen content of each watched file.
#[derive(Default)]
pub struct WinampNp {
    last_content: Mutex<HashMap<&'static str, String>>,
}

impl WinampNp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the watched files; `Some(contents)` when anything changed.
    async fn changed_files(&self, dir: &Path) -> Result<Option<HashMap<&'static str, String>>> {
        let mut last = self.last_content.lock().await;
        let mut changed = false;
        for file in WATCH_FILES {
            let data = tokio::fs::read_to_string(dir.join(file)).await?;
            if last.get(file) != Some(&data) {
                last.insert(file, data);
                changed = true;
            }
        }
        Ok(changed.then(|| last.clone()))
    }
}

/// Build the stored state from the watched files' contents.
pub fn now_playing(is_playing: &str, song: &str) -> NowPlaying {
    let is_playing = is_playing.trim();
    NowPlaying {
        is_currently_playing: is_playing == "1" || is_playing.eq_ignore_ascii_case("true"),
        song: song.trim().to_string(),
        updated: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    }
}

#[async_trait]
impl CronTask for WinampNp {
    async fn tick(&self, ctx: &TickContext) -> Result<()> {
        let dir = ctx
            .config
            .get("data_path")
            .and_then(|v| v.as_str())
            .map(expand_path)
            .ok_or_else(|| ZerglingError::Config("[tasks.winampnp] data_path is not set".into()))?;

        let Some(files) = self.changed_files(&dir).await? else {
            return Ok(());
        };
        let state = now_playing(
            files.get("is_playing.txt").map(String::as_str).unwrap_or_default(),
            files.get("song.txt").map(String::as_str).unwrap_or_default(),
        );
        ctx.log.debug(format!("Now playing: {} ({})", state.song, state.is_currently_playing));

        let np_data = &ctx.stream.np_data;
        np_data.set_now_playing(&state).await?;
        np_data.broadcast_fresh().await;
        Ok(())
    }
}
