//! Canned replies whose trigger words come from config.
//!
//! ```toml
//! [[actions.reply.triggers]]
//! triggers = ["hi", "hello"]
//! reply = "Hello there!"
//! help = "Says hello."
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use zergling_core::{Result, ZerglingError};

use crate::context::ActionContext;
use crate::registry::{Command, CommandAction, CommandArgs, CommandRegistry, HelpText, TriggerSet};

#[derive(Debug, Default, Deserialize)]
struct ReplyConfig {
    #[serde(default)]
    triggers: Vec<ReplyTrigger>,
}

#[derive(Debug, Deserialize)]
struct ReplyTrigger {
    #[serde(default)]
    triggers: Vec<String>,
    reply: String,
    #[serde(default)]
    help: Option<String>,
}

impl ReplyConfig {
    fn parse(config: &toml::Value) -> Result<Self> {
        config
            .clone()
            .try_into()
            .map_err(|e| ZerglingError::Config(format!("[actions.reply]: {e}")))
    }

    /// Parse for trigger and help lookups, where a bad config just matches nothing.
    fn parse_lenient(config: &toml::Value) -> Self {
        Self::parse(config).unwrap_or_else(|e| {
            tracing::warn!("⚠️ {e}");
            Self::default()
        })
    }

    fn find(&self, trigger: &str) -> Option<&ReplyTrigger> {
        self.triggers
            .iter()
            .find(|item| item.triggers.iter().any(|t| t == trigger))
    }
}

pub struct Reply;

pub fn command() -> Command {
    let triggers = TriggerSet::dynamic(|user_trigger, config, want_all, first_only| {
        let parsed = ReplyConfig::parse_lenient(config);
        if want_all {
            return parsed
                .triggers
                .iter()
                .flat_map(|item| {
                    let take = if first_only { 1 } else { item.triggers.len() };
                    item.triggers.iter().take(take).cloned()
                })
                .collect();
        }
        parsed
            .find(user_trigger)
            .map(|item| item.triggers.clone())
            .unwrap_or_default()
    });
    let help = HelpText::dynamic(|user_trigger, config| {
        ReplyConfig::parse_lenient(config)
            .find(user_trigger)
            .and_then(|item| item.help.clone())
            .unwrap_or_else(|| "No help found.".to_string())
    });
    Command::new("reply", triggers, Reply).help(help)
}

#[async_trait]
impl CommandAction for Reply {
    async fn execute(
        &self,
        ctx: &ActionContext,
        _args: &CommandArgs,
        config: &toml::Value,
        _commands: &CommandRegistry,
        trigger: &str,
    ) -> Result<()> {
        let parsed = ReplyConfig::parse(config)?;
        let Some(item) = parsed.find(trigger) else {
            return Ok(());
        };
        ctx.stream.post_to_channel(&item.reply, true, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver;
    use zergling_core::ZerglingConfig;
    use zergling_stream::testing;

    const CONFIG: &str = r#"
        [[actions.reply.triggers]]
        triggers = ["hi", "hello"]
        reply = "Hello there!"

        [[actions.reply.triggers]]
        triggers = ["rules"]
        reply = "Be nice."
        help = "Shows the rules."
    "#;

    #[test]
    fn test_dynamic_trigger_lists() {
        let config = ZerglingConfig::parse(CONFIG).unwrap();
        let cmd = command();
        let slice = config.action_config("reply");

        assert_eq!(cmd.triggers.resolve("hello", &slice, false, false), vec!["hi", "hello"]);
        assert!(cmd.triggers.resolve("nope", &slice, false, false).is_empty());
        assert_eq!(cmd.triggers.resolve("", &slice, true, false), vec!["hi", "hello", "rules"]);
        assert_eq!(cmd.triggers.resolve("", &slice, true, true), vec!["hi", "rules"]);
        assert_eq!(cmd.help.text("hi", &slice), "No help found.");
        assert_eq!(cmd.help.text("rules", &slice), "Shows the rules.");
    }

    #[test]
    fn test_missing_config_has_no_triggers() {
        let cmd = command();
        let empty = zergling_core::config::empty_table();
        assert!(cmd.triggers.resolve("hi", &empty, false, false).is_empty());
    }

    #[tokio::test]
    async fn test_replies_quietly() {
        let dir = tempfile::tempdir().unwrap();
        let config = ZerglingConfig::parse(CONFIG).unwrap();
        let (stream, sink) = testing::interface_with(config, dir.path(), None).unwrap();
        let registry = CommandRegistry::new(vec![command()]).unwrap();
        let ctx = ActionContext::for_default_channel(stream);

        let res = resolver::execute_command_triggers("!rules please", &registry, &ctx)
            .await
            .unwrap();
        assert_eq!(res.trigger, Some("rules"));
        let lines = sink.lines();
        assert_eq!(lines[0].message, "Be nice.");
        assert!(lines[0].quiet);
    }
}
