//! "Randomize Winamp Skin" / "Pick Winamp Skin".
//!
//! Skins are the `.wsz` files in `[actions.skin] skin_base_dir`. The chosen
//! file name is stored as `skinfn` in the `webamp_data` realm and broadcast
//! to the Webamp overlay.

use std::path::Path;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use zergling_core::config::expand_path;
use zergling_core::{RedemptionEvent, Result, ZerglingError};

use crate::context::ActionContext;
use crate::registry::{Redemption, RedemptionAction};

pub const RANDOMIZE: &str = "randomizeWinampSkin";
pub const PICK: &str = "pickWinampSkin";

pub const DEFAULT_RANDOMIZE_REWARD_ID: &str = "dbbc46cc-ba90-4e0b-b2e0-1a8b8be49fb6";
pub const DEFAULT_PICK_REWARD_ID: &str = "596fc4ce-c6bf-4cd2-841e-29e73681d777";

/// Assumed current skin when none was ever set.
const DEFAULT_SKIN: &str = "[base-2.91.wsz";

/// A chosen skin and, for searches, how many skins matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkinChoice {
    pub skin: String,
    pub matches: Option<usize>,
}

pub struct Skin;

/// `[actions.skin] reward_randomize` / `reward_pick` override the reward IDs.
pub fn redemption(config: &toml::Value) -> Result<Redemption> {
    let id = |key: &str, default: &'static str| {
        config
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| default.to_string())
    };
    let randomize = id("reward_randomize", DEFAULT_RANDOMIZE_REWARD_ID);
    let pick = id("reward_pick", DEFAULT_PICK_REWARD_ID);
    Redemption::new(
        "skin",
        &[(randomize.as_str(), RANDOMIZE), (pick.as_str(), PICK)],
        "Changes the current Winamp skin.",
        Skin,
    )
}

#[async_trait]
impl RedemptionAction for Skin {
    async fn execute(
        &self,
        ctx: &ActionContext,
        kind: &str,
        message: Option<&str>,
        config: &toml::Value,
        _event: &RedemptionEvent,
    ) -> Result<()> {
        let base_dir = config
            .get("skin_base_dir")
            .and_then(|v| v.as_str())
            .map(expand_path)
            .ok_or_else(|| ZerglingError::Config("[actions.skin] skin_base_dir is not set".into()))?;
        let stream = &ctx.stream;

        // Never "change" to the skin that is already on.
        let current = stream
            .webamp
            .current_skin()
            .await
            .unwrap_or_else(|| DEFAULT_SKIN.to_string());
        let pool = skin_pool(&base_dir).await?;
        if pool.is_empty() {
            return Err(ZerglingError::Config(format!("no .wsz skins in {}", base_dir.display())));
        }

        let term = message.map(str::trim).filter(|t| !t.is_empty());
        let choice = match (kind, term) {
            (RANDOMIZE, _) | (PICK, None) => pick_random(&pool, &current),
            (PICK, Some(term)) => pick_by_search(&pool, &current, term),
            (other, _) => {
                tracing::warn!("⚠️ Unknown skin redemption type: {other}");
                return Ok(());
            }
        };
        let name = skin_name(&choice.skin).to_string();

        stream.webamp.set_skin(&choice.skin).await?;
        stream.webamp.broadcast().await;

        for (line, quiet) in feedback(&choice, &name, term.unwrap_or_default()) {
            stream.post_to_channel(&line, quiet, None).await?;
        }
        tracing::info!("🎨 Updated Winamp skin to {name}");
        Ok(())
    }
}

/// Sorted `.wsz` file names in `dir`.
pub async fn skin_pool(dir: &Path) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut skins = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.to_lowercase().ends_with(".wsz") {
            skins.push(name);
        }
    }
    skins.sort();
    Ok(skins)
}

/// Skins whose name contains `term`, ignoring case.
pub fn search_pool<'a>(pool: &'a [String], term: &str) -> Vec<&'a String> {
    let term = term.to_lowercase();
    pool.iter()
        .filter(|skin| skin_name(skin).to_lowercase().contains(&term))
        .collect()
}

/// Pick any skin other than `current`; `current` only when it is the only one.
pub fn pick_random(pool: &[String], current: &str) -> SkinChoice {
    let refs: Vec<&String> = pool.iter().collect();
    SkinChoice {
        skin: choose_other(&refs, current),
        matches: None,
    }
}

/// Pick a matching skin other than `current`, or a random one when nothing matches.
pub fn pick_by_search(pool: &[String], current: &str, term: &str) -> SkinChoice {
    let results = search_pool(pool, term);
    if results.is_empty() {
        tracing::info!("No Winamp skin results for term {term}");
        return SkinChoice {
            matches: Some(0),
            ..pick_random(pool, current)
        };
    }
    tracing::info!("Searched Winamp skins for term {term} and found {} result(s)", results.len());
    SkinChoice {
        skin: choose_other(&results, current),
        matches: Some(results.len()),
    }
}

fn choose_other(items: &[&String], current: &str) -> String {
    let others: Vec<&&String> = items.iter().filter(|s| s.as_str() != current).collect();
    let mut rng = rand::thread_rng();
    others
        .choose(&mut rng)
        .map(|s| s.to_string())
        .or_else(|| items.first().map(|s| s.to_string()))
        .unwrap_or_else(|| current.to_string())
}

/// Display name of a skin file.
pub fn skin_name(file: &str) -> &str {
    let len = file.len();
    if len > 4 && file[len - 4..].eq_ignore_ascii_case(".wsz") {
        &file[..len - 4]
    } else {
        file
    }
}

/// Chat lines reporting the change, as `(text, quiet)`.
pub fn feedback(choice: &SkinChoice, name: &str, term: &str) -> Vec<(String, bool)> {
    match choice.matches {
        Some(0) => vec![(
            format!("Found 0 search results for \"{term}\". Picking a random skin instead: {name}."),
            false,
        )],
        Some(n) if n != 1 => vec![
            (format!("Found {n} search results for \"{term}\"."), true),
            (format!("Changed Winamp skin to: {name}."), false),
        ],
        _ => vec![(format!("Changed Winamp skin to: {name}."), false)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RedemptionRegistry;
    use crate::resolver;
    use zergling_core::ZerglingConfig;
    use zergling_stream::testing;

    fn pool(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_skin_name() {
        assert_eq!(skin_name("Bento.wsz"), "Bento");
        assert_eq!(skin_name("Loud.WSZ"), "Loud");
        assert_eq!(skin_name("odd"), "odd");
    }

    #[test]
    fn test_random_avoids_current() {
        let pool = pool(&["a.wsz", "b.wsz"]);
        for _ in 0..20 {
            assert_eq!(pick_random(&pool, "a.wsz").skin, "b.wsz");
        }
        let single = vec!["a.wsz".to_string()];
        assert_eq!(pick_random(&single, "a.wsz").skin, "a.wsz");
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let pool = pool(&["Bento.wsz", "Bento Classic.wsz", "Winamp3.wsz"]);
        let choice = pick_by_search(&pool, "Bento.wsz", "bENTo");
        assert_eq!(choice.skin, "Bento Classic.wsz");
        assert_eq!(choice.matches, Some(2));

        let none = pick_by_search(&pool, "Bento.wsz", "zzz");
        assert_eq!(none.matches, Some(0));
        assert_ne!(none.skin, "Bento.wsz");
    }

    #[test]
    fn test_feedback_lines() {
        let random = SkinChoice { skin: "a.wsz".into(), matches: Some(0) };
        assert_eq!(
            feedback(&random, "a", "zzz"),
            vec![("Found 0 search results for \"zzz\". Picking a random skin instead: a.".to_string(), false)]
        );
        let many = SkinChoice { skin: "a.wsz".into(), matches: Some(3) };
        assert_eq!(feedback(&many, "a", "x").len(), 2);
        let one = SkinChoice { skin: "a.wsz".into(), matches: Some(1) };
        assert_eq!(feedback(&one, "a", "x"), vec![("Changed Winamp skin to: a.".to_string(), false)]);
    }

    #[tokio::test]
    async fn test_pick_stores_and_broadcasts() {
        let data = tempfile::tempdir().unwrap();
        let skins = tempfile::tempdir().unwrap();
        for name in ["Bento.wsz", "Winamp3.wsz", "readme.txt"] {
            std::fs::write(skins.path().join(name), b"").unwrap();
        }
        let config = ZerglingConfig::parse(&format!(
            "[actions.skin]\nskin_base_dir = {:?}\n",
            skins.path().display().to_string()
        ))
        .unwrap();
        let (stream, sink) = testing::interface_with(config, data.path(), None).unwrap();
        let mut rx = stream.bus().subscribe();
        let registry = RedemptionRegistry::new(vec![redemption(&zergling_core::config::empty_table()).unwrap()]).unwrap();
        let ctx = ActionContext::for_default_channel(stream.clone());

        let event = RedemptionEvent {
            reward_id: DEFAULT_PICK_REWARD_ID.into(),
            reward_title: "Pick Winamp Skin".into(),
            user_name: "viewer".into(),
            user_id: "1".into(),
            message: Some("winamp".into()),
            reward_cost: 500,
        };
        resolver::execute_redemption_triggers(&event, &registry, &ctx).await.unwrap();

        assert_eq!(stream.webamp.current_skin().await.as_deref(), Some("Winamp3.wsz"));
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.payload, Some(serde_json::json!({"skinfn": "Winamp3.wsz"})));
        assert_eq!(sink.messages(), vec!["Changed Winamp skin to: Winamp3."]);
    }
}
