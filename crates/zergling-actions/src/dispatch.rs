//! The boundary between inbound events and the resolver.
//!
//! Every chat line and redemption runs in its own tokio task. Handler
//! errors stop here: they are logged and reported as [`DispatchOutcome::Failed`].

use std::sync::Arc;

use tokio::task::JoinHandle;
use zergling_core::{ChatMessage, RedemptionEvent, ZerglingError};
use zergling_stream::StreamInterface;

use crate::context::ActionContext;
use crate::registry::{CommandRegistry, RedemptionRegistry};
use crate::resolver;

/// What became of one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Sent by the bot itself, or a redemption echo in chat.
    Ignored,
    /// No command character / unknown reward.
    NoTrigger,
    /// A trigger word no command answers to.
    Unknown(String),
    /// The named command or redemption ran to completion.
    Handled(String),
    /// The named command or redemption failed.
    Failed { name: String, error: String },
}

pub struct Dispatcher {
    stream: Arc<StreamInterface>,
    commands: Arc<CommandRegistry>,
    redemptions: Arc<RedemptionRegistry>,
}

impl Dispatcher {
    pub fn new(stream: Arc<StreamInterface>, commands: CommandRegistry, redemptions: RedemptionRegistry) -> Self {
        tracing::info!(
            "🧭 Dispatcher ready: {} commands, {} redemptions",
            commands.len(),
            redemptions.len()
        );
        Self {
            stream,
            commands: Arc::new(commands),
            redemptions: Arc::new(redemptions),
        }
    }

    pub fn stream(&self) -> &Arc<StreamInterface> {
        &self.stream
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn redemptions(&self) -> &RedemptionRegistry {
        &self.redemptions
    }

    /// Resolve and run one chat line.
    pub async fn handle_chat_message(&self, message: ChatMessage) -> DispatchOutcome {
        let nickname = &self.stream.config().chat.nickname;
        if message.user.eq_ignore_ascii_case(nickname) || message.is_redemption {
            return DispatchOutcome::Ignored;
        }

        let text = message.text.clone();
        let ctx = ActionContext::for_message(self.stream.clone(), message);
        match resolver::execute_command_triggers(&text, &self.commands, &ctx).await {
            Ok(res) => match (res.trigger, res.command) {
                (Some(_), Some(command)) => DispatchOutcome::Handled(command.name.clone()),
                (Some(trigger), None) => {
                    tracing::debug!("Unknown trigger: {trigger}");
                    DispatchOutcome::Unknown(trigger.to_string())
                }
                (None, _) => DispatchOutcome::NoTrigger,
            },
            Err(e) => failed(e),
        }
    }

    /// Resolve and run one channel-point redemption.
    pub async fn handle_redemption(&self, event: RedemptionEvent) -> DispatchOutcome {
        let ctx = ActionContext::for_default_channel(self.stream.clone());
        match resolver::execute_redemption_triggers(&event, &self.redemptions, &ctx).await {
            Ok(res) => match res.redemption {
                Some(redemption) => DispatchOutcome::Handled(redemption.name.clone()),
                None => {
                    tracing::debug!(
                        "No handler for reward \"{}\" ({})",
                        event.reward_title,
                        event.reward_id
                    );
                    DispatchOutcome::NoTrigger
                }
            },
            Err(e) => failed(e),
        }
    }

    /// Run a chat line on its own task.
    pub fn spawn_chat_message(self: &Arc<Self>, message: ChatMessage) -> JoinHandle<DispatchOutcome> {
        let this = self.clone();
        tokio::spawn(async move { this.handle_chat_message(message).await })
    }

    /// Run a redemption on its own task.
    pub fn spawn_redemption(self: &Arc<Self>, event: RedemptionEvent) -> JoinHandle<DispatchOutcome> {
        let this = self.clone();
        tokio::spawn(async move { this.handle_redemption(event).await })
    }
}

fn failed(e: ZerglingError) -> DispatchOutcome {
    let name = match &e {
        ZerglingError::Handler { name, .. } => name.clone(),
        _ => "unknown".to_string(),
    };
    tracing::error!("❌ {e}");
    DispatchOutcome::Failed {
        name,
        error: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::Noop;
    use crate::registry::{Command, CommandAction, CommandArgs, Redemption, TriggerSet};
    use async_trait::async_trait;
    use zergling_core::{Result, ZerglingConfig};
    use zergling_stream::testing;

    struct Boom;

    #[async_trait]
    impl CommandAction for Boom {
        async fn execute(
            &self,
            _ctx: &ActionContext,
            _args: &CommandArgs,
            _config: &toml::Value,
            _commands: &CommandRegistry,
            _trigger: &str,
        ) -> Result<()> {
            Err(ZerglingError::Channel("chat is down".into()))
        }
    }

    fn dispatcher(dir: &std::path::Path) -> Arc<Dispatcher> {
        let mut config = ZerglingConfig::default();
        config.chat.nickname = "zergling_bot".into();
        let (stream, _) = testing::interface_with(config, dir, None).unwrap();
        let commands = CommandRegistry::new(vec![
            Command::new("ok", TriggerSet::words(&["ok"]), Noop),
            Command::new("boom", TriggerSet::words(&["boom"]), Boom),
        ])
        .unwrap();
        let redemptions = RedemptionRegistry::new(vec![Redemption::new(
            "noop",
            &[("a2bab21e-2abe-4bd5-8a2f-3d87d0981726", "noop")],
            "Does nothing.",
            Noop,
        )
        .unwrap()])
        .unwrap();
        Arc::new(Dispatcher::new(stream, commands, redemptions))
    }

    #[tokio::test]
    async fn test_chat_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let d = dispatcher(dir.path());

        let msg = |user: &str, text: &str| ChatMessage::new("#chan", user, text);
        assert_eq!(d.handle_chat_message(msg("viewer", "!ok")).await, DispatchOutcome::Handled("ok".into()));
        assert_eq!(d.handle_chat_message(msg("viewer", "hello")).await, DispatchOutcome::NoTrigger);
        assert_eq!(
            d.handle_chat_message(msg("viewer", "!nope")).await,
            DispatchOutcome::Unknown("nope".into())
        );
        assert_eq!(d.handle_chat_message(msg("Zergling_Bot", "!ok")).await, DispatchOutcome::Ignored);

        let mut redeemed = msg("viewer", "!ok");
        redeemed.is_redemption = true;
        assert_eq!(d.handle_chat_message(redeemed).await, DispatchOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_handler_failure_is_contained() {
        let dir = tempfile::tempdir().unwrap();
        let d = dispatcher(dir.path());

        let outcome = d
            .spawn_chat_message(ChatMessage::new("#chan", "viewer", "!boom"))
            .await
            .unwrap();
        match outcome {
            DispatchOutcome::Failed { name, error } => {
                assert_eq!(name, "boom");
                assert!(error.contains("chat is down"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        // Still serving.
        let next = d.spawn_chat_message(ChatMessage::new("#chan", "viewer", "!ok")).await.unwrap();
        assert_eq!(next, DispatchOutcome::Handled("ok".into()));
    }

    #[tokio::test]
    async fn test_redemption_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let d = dispatcher(dir.path());
        let event = |id: &str| RedemptionEvent {
            reward_id: id.into(),
            reward_title: "Thing".into(),
            user_name: "viewer".into(),
            user_id: "1".into(),
            message: None,
            reward_cost: 1,
        };

        let hit = d.spawn_redemption(event("a2bab21e-2abe-4bd5-8a2f-3d87d0981726")).await.unwrap();
        assert_eq!(hit, DispatchOutcome::Handled("noop".into()));
        let miss = d.spawn_redemption(event("not-a-uuid")).await.unwrap();
        assert_eq!(miss, DispatchOutcome::NoTrigger);
    }
}
