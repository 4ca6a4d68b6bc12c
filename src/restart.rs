//! Restart file: another invocation (`zergling --restart`) drops
//! `restart.json` into the config directory to ask the running bot to exit.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;

pub const RESTART_FILE: &str = "restart.json";

pub fn restart_path(config_dir: &Path) -> PathBuf {
    config_dir.join(RESTART_FILE)
}

/// Write the restart request.
pub fn request_restart(config_dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(config_dir)?;
    let path = restart_path(config_dir);
    let body = json!({ "date": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true) });
    std::fs::write(&path, serde_json::to_string(&body)?)?;
    Ok(path)
}

/// Remove the restart file. Returns when it was requested, if it existed.
pub fn take_restart_request(config_dir: &Path) -> Option<Option<DateTime<Utc>>> {
    let path = restart_path(config_dir);
    let content = std::fs::read_to_string(&path).ok()?;
    if let Err(e) = std::fs::remove_file(&path) {
        tracing::warn!("⚠️ Could not remove {}: {e}", path.display());
    }
    let date = serde_json::from_str::<serde_json::Value>(&content)
        .ok()
        .and_then(|v| v["date"].as_str().map(str::to_string))
        .and_then(|d| DateTime::parse_from_rfc3339(&d).ok())
        .map(|d| d.with_timezone(&Utc));
    Some(date)
}

/// Check once per `interval` until a restart is requested.
pub async fn wait_for_restart(config_dir: PathBuf, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if let Some(date) = take_restart_request(&config_dir) {
            match date {
                Some(date) => tracing::info!("🔁 Restart requested at {date}"),
                None => tracing::info!("🔁 Restart requested"),
            }
            return;
        }
    }
}
