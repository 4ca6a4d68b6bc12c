//! `!discord`: post the Discord invite link.

use async_trait::async_trait;
use zergling_core::{Result, ZerglingError};

use crate::context::ActionContext;
use crate::registry::{Command, CommandAction, CommandArgs, CommandRegistry, TriggerSet};

pub struct Discord;

pub fn command() -> Command {
    Command::new("discord", TriggerSet::words(&["discord"]), Discord).help("Shows a link to the Discord server.")
}

#[async_trait]
impl CommandAction for Discord {
    async fn execute(
        &self,
        ctx: &ActionContext,
        _args: &CommandArgs,
        config: &toml::Value,
        _commands: &CommandRegistry,
        _trigger: &str,
    ) -> Result<()> {
        let link = config
            .get("invite_link")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ZerglingError::Config("[actions.discord] invite_link is not set".into()))?;
        ctx.reply(&format!("Join us on Discord: {link}"), true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver;
    use zergling_core::ZerglingConfig;
    use zergling_stream::testing;

    #[tokio::test]
    async fn test_posts_invite_link() {
        let dir = tempfile::tempdir().unwrap();
        let config = ZerglingConfig::parse("[actions.discord]\ninvite_link = \"https://discord.gg/xyz\"").unwrap();
        let (stream, sink) = testing::interface_with(config, dir.path(), None).unwrap();
        let registry = CommandRegistry::new(vec![command()]).unwrap();
        let ctx = ActionContext::for_default_channel(stream);

        resolver::execute_command_triggers("!discord", &registry, &ctx).await.unwrap();
        assert_eq!(sink.messages(), vec!["Join us on Discord: https://discord.gg/xyz"]);
    }

    #[tokio::test]
    async fn test_missing_link_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (stream, _) = testing::interface(dir.path()).unwrap();
        let registry = CommandRegistry::new(vec![command()]).unwrap();
        let ctx = ActionContext::for_default_channel(stream);

        assert!(resolver::execute_command_triggers("!discord", &registry, &ctx).await.is_err());
    }
}
