//! Command and redemption descriptors, and the registries that hold them.
//!
//! Registries are built once at startup and never change afterwards.
//! Iteration order is registration order, which is also match order.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;
use zergling_core::{RedemptionEvent, Result, ZerglingError};

use crate::context::ActionContext;

/// Computes a trigger list from `(user_trigger, command_config, want_all, first_only)`.
pub type TriggerFn = Arc<dyn Fn(&str, &toml::Value, bool, bool) -> Vec<String> + Send + Sync>;

/// Computes help text from `(user_trigger, command_config)`.
pub type HelpFn = Arc<dyn Fn(&str, &toml::Value) -> String + Send + Sync>;

/// The words that trigger a command.
#[derive(Clone)]
pub enum TriggerSet {
    /// Fixed trigger words; the first one is the command's main trigger.
    Static(Vec<String>),
    /// Trigger words that depend on per-deployment config.
    Dynamic(TriggerFn),
}

impl TriggerSet {
    pub fn words(words: &[&str]) -> Self {
        TriggerSet::Static(words.iter().map(|w| w.to_string()).collect())
    }

    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&str, &toml::Value, bool, bool) -> Vec<String> + Send + Sync + 'static,
    {
        TriggerSet::Dynamic(Arc::new(f))
    }

    /// Resolve the trigger list.
    ///
    /// With `want_all` a dynamic set returns every configured trigger instead
    /// of only those relevant to `user_trigger`. `first_only` keeps the main
    /// trigger of each entry.
    pub fn resolve(&self, user_trigger: &str, config: &toml::Value, want_all: bool, first_only: bool) -> Vec<String> {
        match self {
            TriggerSet::Static(words) if first_only => words.iter().take(1).cloned().collect(),
            TriggerSet::Static(words) => words.clone(),
            TriggerSet::Dynamic(f) => f(user_trigger, config, want_all, first_only),
        }
    }
}

impl fmt::Debug for TriggerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerSet::Static(words) => f.debug_tuple("Static").field(words).finish(),
            TriggerSet::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Help text shown by `!help`.
#[derive(Clone)]
pub enum HelpText {
    Static(String),
    Dynamic(HelpFn),
}

impl HelpText {
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&str, &toml::Value) -> String + Send + Sync + 'static,
    {
        HelpText::Dynamic(Arc::new(f))
    }

    pub fn text(&self, user_trigger: &str, config: &toml::Value) -> String {
        match self {
            HelpText::Static(text) => text.clone(),
            HelpText::Dynamic(f) => f(user_trigger, config),
        }
    }
}

impl From<&str> for HelpText {
    fn from(text: &str) -> Self {
        HelpText::Static(text.to_string())
    }
}

/// The argument shape a command accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Takes {
    /// Everything after the trigger, unparsed.
    Remainder,
    /// Positional whitespace-separated arguments, by name.
    Named(Vec<String>),
}

impl Takes {
    pub fn nothing() -> Self {
        Takes::Named(Vec::new())
    }

    pub fn named(names: &[&str]) -> Self {
        Takes::Named(names.iter().map(|n| n.to_string()).collect())
    }
}

/// Arguments sliced from the text after a trigger word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs {
    /// Named positional arguments that were present.
    pub named: BTreeMap<String, String>,
    /// Text left over after the named arguments.
    pub remainder: String,
}

impl CommandArgs {
    /// A named argument, or `None` when the user did not supply it.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }
}

/// Runs a matched command.
#[async_trait]
pub trait CommandAction: Send + Sync {
    async fn execute(
        &self,
        ctx: &ActionContext,
        args: &CommandArgs,
        config: &toml::Value,
        commands: &CommandRegistry,
        trigger: &str,
    ) -> Result<()>;
}

/// Runs a matched redemption. `kind` is the type tag of the reward that fired.
#[async_trait]
pub trait RedemptionAction: Send + Sync {
    async fn execute(
        &self,
        ctx: &ActionContext,
        kind: &str,
        message: Option<&str>,
        config: &toml::Value,
        event: &RedemptionEvent,
    ) -> Result<()>;
}

/// A chat command.
#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub triggers: TriggerSet,
    pub takes: Takes,
    pub help: HelpText,
    pub is_system: bool,
    pub is_hidden: bool,
    pub action: Arc<dyn CommandAction>,
}

impl Command {
    /// A command that takes no arguments and has no help text.
    pub fn new(name: &str, triggers: TriggerSet, action: impl CommandAction + 'static) -> Self {
        Self {
            name: name.to_string(),
            triggers,
            takes: Takes::nothing(),
            help: HelpText::Static(String::new()),
            is_system: false,
            is_hidden: false,
            action: Arc::new(action),
        }
    }

    pub fn takes(mut self, takes: Takes) -> Self {
        self.takes = takes;
        self
    }

    pub fn help(mut self, help: impl Into<HelpText>) -> Self {
        self.help = help.into();
        self
    }

    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.is_hidden = true;
        self
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("triggers", &self.triggers)
            .field("takes", &self.takes)
            .finish_non_exhaustive()
    }
}

/// A channel-point redemption serving one or more rewards.
#[derive(Clone)]
pub struct Redemption {
    pub name: String,
    /// Reward UUID → local type tag, in match order.
    pub reward_ids: Vec<(Uuid, String)>,
    pub help: HelpText,
    pub action: Arc<dyn RedemptionAction>,
}

impl Redemption {
    /// Build a redemption. Reward IDs must be valid UUIDs.
    pub fn new(
        name: &str,
        reward_ids: &[(&str, &str)],
        help: impl Into<HelpText>,
        action: impl RedemptionAction + 'static,
    ) -> Result<Self> {
        let reward_ids = reward_ids
            .iter()
            .map(|(id, kind)| {
                Uuid::parse_str(id)
                    .map(|uuid| (uuid, kind.to_string()))
                    .map_err(|e| ZerglingError::Registry(format!("redemption '{name}': bad reward id '{id}': {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: name.to_string(),
            reward_ids,
            help: help.into(),
            action: Arc::new(action),
        })
    }

    /// The type tag for a reward, if this redemption serves it.
    pub fn kind_for(&self, reward_id: &Uuid) -> Option<&str> {
        self.reward_ids
            .iter()
            .find(|(id, _)| id == reward_id)
            .map(|(_, kind)| kind.as_str())
    }
}

impl fmt::Debug for Redemption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Redemption")
            .field("name", &self.name)
            .field("reward_ids", &self.reward_ids)
            .finish_non_exhaustive()
    }
}

/// Ordered, validated set of commands.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: Vec<Command>,
}

impl CommandRegistry {
    /// Validate and freeze a command list.
    ///
    /// Fails on a repeated command name or a static trigger word claimed by
    /// two commands. Dynamic trigger sets are only known per message and are
    /// not checked.
    pub fn new(commands: Vec<Command>) -> Result<Self> {
        let mut names = HashSet::new();
        let mut words: BTreeMap<&str, &str> = BTreeMap::new();
        for cmd in &commands {
            if !names.insert(cmd.name.as_str()) {
                return Err(ZerglingError::Registry(format!("duplicate command '{}'", cmd.name)));
            }
            if let TriggerSet::Static(triggers) = &cmd.triggers {
                if triggers.is_empty() {
                    return Err(ZerglingError::Registry(format!("command '{}' has no triggers", cmd.name)));
                }
                for word in triggers {
                    if let Some(owner) = words.insert(word.as_str(), cmd.name.as_str()) {
                        return Err(ZerglingError::Registry(format!(
                            "trigger '{word}' claimed by both '{owner}' and '{}'",
                            cmd.name
                        )));
                    }
                }
            }
        }
        Ok(Self { commands })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Ordered, validated set of redemptions.
#[derive(Debug, Default)]
pub struct RedemptionRegistry {
    redemptions: Vec<Redemption>,
}

impl RedemptionRegistry {
    /// Validate and freeze a redemption list. Fails on a repeated name or a
    /// reward UUID served by two redemptions.
    pub fn new(redemptions: Vec<Redemption>) -> Result<Self> {
        let mut names = HashSet::new();
        let mut rewards = HashSet::new();
        for redemption in &redemptions {
            if !names.insert(redemption.name.as_str()) {
                return Err(ZerglingError::Registry(format!("duplicate redemption '{}'", redemption.name)));
            }
            for (id, _) in &redemption.reward_ids {
                if !rewards.insert(*id) {
                    return Err(ZerglingError::Registry(format!(
                        "reward {id} is claimed twice (last by '{}')",
                        redemption.name
                    )));
                }
            }
        }
        Ok(Self { redemptions })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Redemption> {
        self.redemptions.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Redemption> {
        self.redemptions.iter().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.redemptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.redemptions.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Command action that does nothing.
    pub(crate) struct Noop;

    #[async_trait]
    impl CommandAction for Noop {
        async fn execute(
            &self,
            _ctx: &ActionContext,
            _args: &CommandArgs,
            _config: &toml::Value,
            _commands: &CommandRegistry,
            _trigger: &str,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl RedemptionAction for Noop {
        async fn execute(
            &self,
            _ctx: &ActionContext,
            _kind: &str,
            _message: Option<&str>,
            _config: &toml::Value,
            _event: &RedemptionEvent,
        ) -> Result<()> {
            Ok(())
        }
    }

    const REWARD_A: &str = "dbbc46cc-ba90-4e0b-b2e0-1a8b8be49fb6";
    const REWARD_B: &str = "596fc4ce-c6bf-4cd2-841e-29e73681d777";

    #[test]
    fn test_duplicate_static_trigger_is_rejected() {
        let err = CommandRegistry::new(vec![
            Command::new("song", TriggerSet::words(&["song", "np"]), Noop),
            Command::new("nowplaying", TriggerSet::words(&["np"]), Noop),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("'np'"));
    }

    #[test]
    fn test_duplicate_command_name_is_rejected() {
        let result = CommandRegistry::new(vec![
            Command::new("a", TriggerSet::words(&["a"]), Noop),
            Command::new("a", TriggerSet::words(&["b"]), Noop),
        ]);
        assert!(matches!(result, Err(ZerglingError::Registry(_))));
    }

    #[test]
    fn test_dynamic_triggers_are_not_checked() {
        let dynamic = TriggerSet::dynamic(|_, _, _, _| vec!["help".to_string()]);
        let registry = CommandRegistry::new(vec![
            Command::new("help", TriggerSet::words(&["help"]), Noop),
            Command::new("reply", dynamic, Noop),
        ])
        .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_static_first_only() {
        let set = TriggerSet::words(&["song", "nowplaying"]);
        let config = zergling_core::config::empty_table();
        assert_eq!(set.resolve("x", &config, true, true), vec!["song"]);
        assert_eq!(set.resolve("x", &config, false, false).len(), 2);
    }

    #[test]
    fn test_reward_claimed_twice_is_rejected() {
        let first = Redemption::new("skin", &[(REWARD_A, "randomize"), (REWARD_B, "pick")], "", Noop).unwrap();
        let second = Redemption::new("other", &[(REWARD_B, "x")], "", Noop).unwrap();
        assert!(RedemptionRegistry::new(vec![first, second]).is_err());
    }

    #[test]
    fn test_bad_reward_uuid_is_rejected() {
        assert!(Redemption::new("skin", &[("not-a-uuid", "x")], "", Noop).is_err());
    }

    #[test]
    fn test_kind_for_reward() {
        let skin = Redemption::new("skin", &[(REWARD_A, "randomize"), (REWARD_B, "pick")], "", Noop).unwrap();
        let id = Uuid::parse_str(REWARD_B).unwrap();
        assert_eq!(skin.kind_for(&id), Some("pick"));
        assert_eq!(skin.kind_for(&Uuid::nil()), None);
    }
}
