//! "Set My StarCraft Race": tags a chatter with their race.

use async_trait::async_trait;
use serde_json::json;
use zergling_core::{RedemptionEvent, Result};

use crate::context::ActionContext;
use crate::registry::{Redemption, RedemptionAction};

pub const DEFAULT_REWARD_ID: &str = "a2bab21e-2abe-4bd5-8a2f-3d87d0981726";

/// A race a chatter can pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Race {
    pub slug: &'static str,
    pub name: &'static str,
}

/// Parse the viewer's input. Accepts single letters and full names, any case.
pub fn race_from_message(message: Option<&str>) -> Option<Race> {
    let input = message?.trim().to_lowercase();
    let race = match input.as_str() {
        "t" | "terran" => Race { slug: "terran", name: "Terran" },
        "p" | "protoss" => Race { slug: "protoss", name: "Protoss" },
        "z" | "zerg" => Race { slug: "zerg", name: "Zerg" },
        "r" | "random" => Race { slug: "random", name: "random" },
        "none" | "-" => Race { slug: "none", name: "none (removed badge)" },
        _ => return None,
    };
    Some(race)
}

pub struct ScRace;

/// `[actions.sc_race] reward_id` overrides the reward this answers to.
pub fn redemption(config: &toml::Value) -> Result<Redemption> {
    let reward_id = config
        .get("reward_id")
        .and_then(|v| v.as_str())
        .unwrap_or(DEFAULT_REWARD_ID);
    Redemption::new(
        "sc_race",
        &[(reward_id, "changeRaceInChat")],
        "Sets a user's race icon in chat.",
        ScRace,
    )
}

#[async_trait]
impl RedemptionAction for ScRace {
    async fn execute(
        &self,
        ctx: &ActionContext,
        _kind: &str,
        message: Option<&str>,
        _config: &toml::Value,
        event: &RedemptionEvent,
    ) -> Result<()> {
        let username = event.user_name.as_str();
        let stream = &ctx.stream;

        let Some(race) = race_from_message(message) else {
            stream
                .post_to_channel(
                    &format!("Could not set your StarCraft race, {username}. Pick one of T, P, Z, Random or None."),
                    true,
                    None,
                )
                .await?;
            tracing::info!("Could not set race for {username}; value was {message:?}");
            return Ok(());
        };

        stream
            .chatter_metadata
            .set_chatter_metadata(username, json!({ "tags": { "sc_race": race.slug } }))
            .await?;
        stream
            .post_to_channel(&format!("Updated StarCraft race for {username} to {}.", race.name), true, None)
            .await?;
        stream.chatter_metadata.broadcast().await;
        tracing::info!("Updated race for {username} to {}", race.name);
        Ok(())
    }
}
