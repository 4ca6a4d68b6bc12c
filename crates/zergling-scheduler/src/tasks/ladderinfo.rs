//! StarCraft ladder watcher.
//!
//! Polls the player's ladder profile and keeps three overlay files in the
//! data directory up to date:
//!
//! - `sc_status.json`: whether the game is running
//! - `sc_user.json`: the full profile document
//! - `sc_rank.json`: the active profile's rank fields
//!
//! Rank changes and this month's matches are also kept in
//! `sc_history/<year>/<month>_{rank,matches}.json` and
//! `sc_history/<year>/<year>_{rank,matches}.json`.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use zergling_core::{LadderStatus, Result, ZerglingError};
use zergling_stream::document::{read_json, write_json};

use crate::engine::{CronTask, TickContext};

pub const NAME: &str = "ladderinfo";
pub const DELAY_MS: u64 = 5000;

const ACCOUNT_FIELDS: [&str; 3] = ["auroraId", "battleTag", "countryCode"];
const PROFILE_FIELDS: [&str; 10] = [
    "toon",
    "toonGatewayRegion",
    "rankTier",
    "rankMmr",
    "lastActivity",
    "gameWins",
    "gameLosses",
    "gameDisconnects",
    "leaderboardId",
    "leaderboardRank",
];

#[derive(Default)]
pub struct LadderInfo {
    /// MMR from the previous successful lookup.
    last_mmr: Mutex<Option<Value>>,
}

impl LadderInfo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CronTask for LadderInfo {
    async fn tick(&self, ctx: &TickContext) -> Result<()> {
        let Some(ladder) = ctx.stream.ladder() else {
            return Ok(());
        };
        let player_id = config_string(&ctx.config, "player_id")
            .ok_or_else(|| ZerglingError::Config("[tasks.ladderinfo] player_id is not set".into()))?;
        let region = config_string(&ctx.config, "player_region").unwrap_or_else(|| "1".into());

        let dir = ctx.stream.data_path();
        let now = Utc::now();

        // Lookups fail while the game starts up or shuts down; the status file
        // says "not running" and the next tick tries again.
        let data = match ladder.player_profiles(&player_id, &region).await {
            Ok(LadderStatus::Profile(data)) => data,
            Ok(LadderStatus::NotRunning) => {
                return write_stamped(&dir.join("sc_status.json"), status(false), now).await;
            }
            Err(e) => {
                ctx.log.debug(format!("Ladder lookup failed: {e}"));
                return write_stamped(&dir.join("sc_status.json"), status(false), now).await;
            }
        };
        write_stamped(&dir.join("sc_status.json"), status(true), now).await?;

        let rank = collect_rank_data(&data);
        {
            let mut last_mmr = self.last_mmr.lock().await;
            let mmr = rank.get("rankMmr").cloned();
            if *last_mmr != mmr {
                ctx.log.info(format!(
                    "MMR updated: {} {} rank (pos. {})",
                    display(rank.get("rankMmr")),
                    display(rank.get("rankTier")),
                    display(rank.get("leaderboardRank")),
                ));
                *last_mmr = mmr;
            }
        }

        write_stamped(&dir.join("sc_user.json"), data.clone(), now).await?;
        write_stamped(&dir.join("sc_rank.json"), rank, now).await?;
        write_history_files(&dir.join("sc_history"), &data, now).await
    }
}

fn config_string(config: &toml::Value, key: &str) -> Option<String> {
    match config.get(key)? {
        toml::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        toml::Value::Integer(n) => Some(n.to_string()),
        _ => None,
    }
}

fn status(is_running: bool) -> Value {
    serde_json::json!({ "isRunning": is_running })
}

fn display(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "?".into(),
        Some(other) => other.to_string(),
    }
}

/// Write `value` with a `lastUpdate` timestamp added.
async fn write_stamped(path: &Path, value: Value, now: DateTime<Utc>) -> Result<()> {
    let mut map = match value {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    map.insert("lastUpdate".into(), Value::String(iso(now)));
    write_json(path, &Value::Object(map)).await
}

fn iso(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The profile `activeProfile` points at. Profiles may be a list or a map.
pub fn active_profile(data: &Value) -> Option<&Value> {
    let profiles = data.get("profiles")?;
    match data.get("activeProfile")? {
        Value::Number(n) => profiles.get(usize::try_from(n.as_u64()?).ok()?),
        Value::String(key) => profiles.get(key.as_str()),
        _ => None,
    }
}

/// Account fields plus the active profile's rank fields.
pub fn collect_rank_data(data: &Value) -> Value {
    let mut out = Map::new();
    for key in ACCOUNT_FIELDS {
        if let Some(v) = data.get(key) {
            out.insert(key.into(), v.clone());
        }
    }
    if let Some(profile) = active_profile(data) {
        for key in PROFILE_FIELDS {
            if let Some(v) = profile.get(key) {
                out.insert(key.into(), v.clone());
            }
        }
    }
    Value::Object(out)
}

/// Parse a timestamp that is either an ISO string or epoch milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|d| d.with_timezone(&Utc)),
        Value::Number(n) => DateTime::from_timestamp_millis(n.as_i64()?),
        _ => None,
    }
}

/// This month's matches keyed by ISO timestamp.
///
/// Only the month is compared, so a January match from last year counts in
/// January too.
pub fn collect_match_data(data: &Value, now: DateTime<Utc>) -> Map<String, Value> {
    let Some(matches) = active_profile(data)
        .and_then(|p| p.get("latestMatches"))
        .and_then(Value::as_array)
    else {
        return Map::new();
    };
    matches
        .iter()
        .filter_map(|m| {
            let at = parse_timestamp(m.get("matchTimestamp")?)?;
            (at.month() == now.month()).then(|| (iso(at), m.clone()))
        })
        .collect()
}

/// Add a rank entry keyed by the profile's last activity. `None` when there
/// is nothing to write: no activity time, the same activity as the newest
/// entry, or an unchanged MMR.
pub fn merge_rank_history(old: &Map<String, Value>, data: &Value, rank: &Value) -> Option<Map<String, Value>> {
    let updated = active_profile(data)
        .and_then(|p| p.get("lastActivity"))
        .and_then(parse_timestamp)
        .map(iso)?;
    if let Some((latest_key, latest)) = old.iter().max_by(|a, b| a.0.cmp(b.0)) {
        if *latest_key == updated || latest.get("rankMmr") == rank.get("rankMmr") {
            return None;
        }
    }
    let mut merged = old.clone();
    merged.insert(updated, rank.clone());
    Some(merged)
}

/// Union of old and new matches. `None` when no new match was added.
pub fn merge_match_history(old: &Map<String, Value>, new: Map<String, Value>) -> Option<Map<String, Value>> {
    if new.keys().all(|k| old.contains_key(k)) {
        return None;
    }
    let mut merged = old.clone();
    merged.extend(new);
    Some(merged)
}

async fn read_map(path: &Path) -> Result<Map<String, Value>> {
    Ok(match read_json(path).await? {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

async fn write_history_pair(base: &Path, prefix: &str, data: &Value, now: DateTime<Utc>) -> Result<()> {
    let rank_path = base.join(format!("{prefix}_rank.json"));
    let rank = collect_rank_data(data);
    if let Some(merged) = merge_rank_history(&read_map(&rank_path).await?, data, &rank) {
        write_json(&rank_path, &Value::Object(merged)).await?;
    }

    let matches_path = base.join(format!("{prefix}_matches.json"));
    let matches = collect_match_data(data, now);
    if let Some(merged) = merge_match_history(&read_map(&matches_path).await?, matches) {
        write_json(&matches_path, &Value::Object(merged)).await?;
    }
    Ok(())
}

/// Monthly and yearly history files under `history_dir/<year>/`.
pub async fn write_history_files(history_dir: &Path, data: &Value, now: DateTime<Utc>) -> Result<()> {
    let year = now.year().to_string();
    let year_dir = history_dir.join(&year);
    tokio::fs::create_dir_all(&year_dir).await?;
    write_history_pair(&year_dir, &format!("{:02}", now.month()), data, now).await?;
    write_history_pair(&year_dir, &year, data, now).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TaskLogger;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Arc;
    use zergling_core::{LadderSource, ZerglingConfig};
    use zergling_stream::StreamInterface;
    use zergling_stream::testing::RecordingSink;

    fn profile(mmr: u64, last_activity: &str) -> Value {
        json!({
            "battleTag": "dada#1234",
            "countryCode": "NL",
            "activeProfile": 0,
            "profiles": [{
                "toon": "dada",
                "rankTier": "A",
                "rankMmr": mmr,
                "lastActivity": last_activity,
                "leaderboardRank": 321,
                "secret": "not copied",
                "latestMatches": [
                    {"matchTimestamp": "2024-03-05T20:00:00Z", "result": "win"},
                    {"matchTimestamp": "2024-02-28T20:00:00Z", "result": "loss"}
                ]
            }]
        })
    }

    #[test]
    fn test_collect_rank_data() {
        let rank = collect_rank_data(&profile(2100, "2024-03-05T21:00:00Z"));
        assert_eq!(rank["battleTag"], "dada#1234");
        assert_eq!(rank["rankMmr"], 2100);
        assert!(rank.get("secret").is_none());
        assert!(rank.get("latestMatches").is_none());
    }

    #[test]
    fn test_active_profile_by_key() {
        let data = json!({"activeProfile": "s1", "profiles": {"s1": {"rankMmr": 5}}});
        assert_eq!(active_profile(&data).unwrap()["rankMmr"], 5);
    }

    #[test]
    fn test_only_this_months_matches() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let matches = collect_match_data(&profile(2100, "2024-03-05T21:00:00Z"), now);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches["2024-03-05T20:00:00.000Z"]["result"], "win");
    }

    #[test]
    fn test_rank_history_skips_unchanged_mmr() {
        let first = profile(2100, "2024-03-05T21:00:00Z");
        let merged = merge_rank_history(&Map::new(), &first, &collect_rank_data(&first)).unwrap();
        assert_eq!(merged.len(), 1);

        let same_mmr = profile(2100, "2024-03-06T21:00:00Z");
        assert!(merge_rank_history(&merged, &same_mmr, &collect_rank_data(&same_mmr)).is_none());

        let climbed = profile(2150, "2024-03-06T21:00:00Z");
        let merged = merge_rank_history(&merged, &climbed, &collect_rank_data(&climbed)).unwrap();
        assert_eq!(merged["2024-03-06T21:00:00.000Z"]["rankMmr"], 2150);
    }

    #[test]
    fn test_match_history_only_grows() {
        let mut new = Map::new();
        new.insert("a".into(), json!(1));
        let merged = merge_match_history(&Map::new(), new.clone()).unwrap();
        assert!(merge_match_history(&merged, new).is_none());
    }

    struct Scripted(std::sync::Mutex<Vec<Result<LadderStatus>>>);

    #[async_trait]
    impl LadderSource for Scripted {
        async fn player_profiles(&self, player_id: &str, region: &str) -> Result<LadderStatus> {
            assert_eq!((player_id, region), ("12345", "2"));
            self.0.lock().unwrap().remove(0)
        }
    }

    fn context(dir: &Path, responses: Vec<Result<LadderStatus>>) -> TickContext {
        let config = ZerglingConfig::parse("[tasks.ladderinfo]\nplayer_id = 12345\nplayer_region = \"2\"\n").unwrap();
        let stream = StreamInterface::new(
            Arc::new(config),
            dir.to_path_buf(),
            Arc::new(RecordingSink::default()),
            zergling_stream::EventBus::new(),
        )
        .unwrap()
        .with_ladder(Arc::new(Scripted(std::sync::Mutex::new(responses))));
        let stream = Arc::new(stream);
        TickContext {
            config: stream.config().task_config(NAME),
            stream,
            log: TaskLogger::new(NAME),
        }
    }

    #[tokio::test]
    async fn test_writes_status_user_rank_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let data = profile(2100, "2024-03-05T21:00:00Z");
        let ctx = context(
            dir.path(),
            vec![
                Ok(LadderStatus::Profile(data)),
                Ok(LadderStatus::NotRunning),
                Err(ZerglingError::NotConnected("ladder".into())),
            ],
        );
        let task = LadderInfo::new();

        task.tick(&ctx).await.unwrap();
        let status = read_json(&dir.path().join("sc_status.json")).await.unwrap();
        assert_eq!(status["isRunning"], true);
        assert!(status["lastUpdate"].is_string());
        let rank = read_json(&dir.path().join("sc_rank.json")).await.unwrap();
        assert_eq!(rank["rankMmr"], 2100);
        let user = read_json(&dir.path().join("sc_user.json")).await.unwrap();
        assert_eq!(user["profiles"][0]["toon"], "dada");

        let year = Utc::now().year().to_string();
        let yearly = read_json(&dir.path().join("sc_history").join(&year).join(format!("{year}_rank.json")))
            .await
            .unwrap();
        assert_eq!(yearly["2024-03-05T21:00:00.000Z"]["rankMmr"], 2100);

        // Game closed, then a failed lookup: only the status changes.
        task.tick(&ctx).await.unwrap();
        task.tick(&ctx).await.unwrap();
        let status = read_json(&dir.path().join("sc_status.json")).await.unwrap();
        assert_eq!(status["isRunning"], false);
        let rank = read_json(&dir.path().join("sc_rank.json")).await.unwrap();
        assert_eq!(rank["rankMmr"], 2100);
    }

    #[tokio::test]
    async fn test_missing_player_id_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let stream = StreamInterface::new(
            Arc::new(ZerglingConfig::default()),
            dir.path().to_path_buf(),
            Arc::new(RecordingSink::default()),
            zergling_stream::EventBus::new(),
        )
        .unwrap()
        .with_ladder(Arc::new(Scripted(std::sync::Mutex::new(Vec::new()))));
        let stream = Arc::new(stream);
        let ctx = TickContext {
            config: stream.config().task_config(NAME),
            stream,
            log: TaskLogger::new(NAME),
        };
        let err = LadderInfo::new().tick(&ctx).await.unwrap_err();
        assert!(matches!(err, ZerglingError::Config(_)));
    }
}
