//! Built-in channel-point redemptions.

pub mod sc_race;
pub mod skin;

use zergling_core::{Result, ZerglingConfig};

use crate::registry::Redemption;

/// The bot's redemptions, with reward IDs taken from config where set.
pub fn builtin(config: &ZerglingConfig) -> Result<Vec<Redemption>> {
    Ok(vec![
        skin::redemption(&config.action_config("skin"))?,
        sc_race::redemption(&config.action_config("sc_race"))?,
    ])
}
