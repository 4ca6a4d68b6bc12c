//! # Zergling Actions
//!
//! Chat commands and channel-point redemptions, and the resolver that maps
//! an inbound event onto one of them.
//!
//! ## Architecture
//! ```text
//! "!help song" ──► get_command_trigger ──► find_command (registry order, first wins)
//!                                               │
//!                                               ▼
//!                               slice_remainder ──► CommandAction::execute
//!
//! RedemptionEvent ──► find_redemption (reward UUID) ──► RedemptionAction::execute
//! ```
//! [`Dispatcher`] wraps both: one tokio task per event, handler errors logged.

pub mod commands;
pub mod context;
pub mod dispatch;
pub mod redemptions;
pub mod registry;
pub mod resolver;

pub use context::ActionContext;
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use registry::{
    Command, CommandAction, CommandArgs, CommandRegistry, HelpText, Redemption, RedemptionAction,
    RedemptionRegistry, Takes, TriggerSet,
};
pub use resolver::{execute_command_triggers, execute_redemption_triggers};

use zergling_core::{Result, ZerglingConfig};

/// The built-in command and redemption registries.
pub fn build_registries(config: &ZerglingConfig) -> Result<(CommandRegistry, RedemptionRegistry)> {
    let commands = CommandRegistry::new(commands::builtin())?;
    let redemptions = RedemptionRegistry::new(redemptions::builtin(config)?)?;
    Ok((commands, redemptions))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registries_are_consistent() {
        let (commands, redemptions) = build_registries(&ZerglingConfig::default()).unwrap();
        assert_eq!(commands.len(), 4);
        assert_eq!(redemptions.len(), 2);
        assert!(commands.get("help").is_some_and(|c| c.is_system));
    }

    #[test]
    fn test_reward_id_override() {
        let config = ZerglingConfig::parse(
            "[actions.sc_race]\nreward_id = \"00000000-0000-0000-0000-000000000001\"\n",
        )
        .unwrap();
        let (_, redemptions) = build_registries(&config).unwrap();
        let found = resolver::find_redemption("00000000-0000-0000-0000-000000000001", &redemptions);
        assert_eq!(found.map(|(r, _)| r.name.as_str()), Some("sc_race"));
    }
}
