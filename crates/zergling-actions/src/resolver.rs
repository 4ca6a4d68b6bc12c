//! Matches chat text and redemption IDs against the registries.
//!
//! Matching is exact and case-sensitive; the first descriptor in
//! registration order wins. Handler errors are returned to the caller
//! wrapped as [`ZerglingError::Handler`].

use uuid::Uuid;
use zergling_core::{RedemptionEvent, Result, ZerglingConfig, ZerglingError};

use crate::context::ActionContext;
use crate::registry::{Command, CommandArgs, CommandRegistry, Redemption, RedemptionRegistry, Takes};

/// Outcome of resolving one chat line.
#[derive(Debug)]
pub struct CommandResolution<'t, 'r> {
    /// The trigger word, when the line started with the command character.
    pub trigger: Option<&'t str>,
    /// The command that ran, if any matched.
    pub command: Option<&'r Command>,
}

impl CommandResolution<'_, '_> {
    /// Whether the line contained a trigger word at all.
    pub fn has_trigger(&self) -> bool {
        self.trigger.is_some()
    }
}

/// Outcome of resolving one redemption.
#[derive(Debug)]
pub struct RedemptionResolution<'r> {
    pub redemption: Option<&'r Redemption>,
    /// Type tag of the reward that matched.
    pub kind: Option<&'r str>,
}

impl RedemptionResolution<'_> {
    pub fn matched(&self) -> bool {
        self.redemption.is_some()
    }
}

/// Split a chat line into its trigger word and the text after it.
///
/// The trigger is the token directly after `cmd_char`, up to the first
/// whitespace. `"! foo"` has no trigger. The remainder has its leading
/// whitespace removed.
pub fn get_command_trigger<'a>(text: &'a str, cmd_char: &str) -> Option<(&'a str, &'a str)> {
    let rest = text.trim().strip_prefix(cmd_char)?;
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    Some((&rest[..end], rest[end..].trim_start()))
}

/// Slice the arguments a command takes from the text after its trigger.
///
/// Named arguments take one whitespace-separated token each, in order;
/// arguments the user left out are simply absent. Whatever follows the last
/// named token (with its whitespace run) is the new remainder, internal
/// spacing intact.
pub fn slice_remainder(takes: &Takes, remainder: &str) -> CommandArgs {
    let names = match takes {
        Takes::Remainder => {
            return CommandArgs {
                remainder: remainder.to_string(),
                ..Default::default()
            };
        }
        Takes::Named(names) => names,
    };
    if names.is_empty() {
        return CommandArgs::default();
    }

    let mut args = CommandArgs::default();
    let mut rest = remainder.trim_start();
    for name in names {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        if end > 0 {
            args.named.insert(name.clone(), rest[..end].to_string());
        }
        rest = rest[end..].trim_start();
    }
    args.remainder = rest.to_string();
    args
}

/// The first command, in registration order, whose trigger set contains `trigger`.
pub fn find_command<'r>(
    trigger: &str,
    commands: &'r CommandRegistry,
    config: &ZerglingConfig,
) -> Option<&'r Command> {
    commands.iter().find(|cmd| {
        let cmd_config = config.action_config(&cmd.name);
        cmd.triggers
            .resolve(trigger, &cmd_config, false, false)
            .iter()
            .any(|word| word == trigger)
    })
}

/// The redemption serving `reward_id`, with the reward's type tag.
/// A reward ID that is not a UUID never matches.
pub fn find_redemption<'r>(
    reward_id: &str,
    redemptions: &'r RedemptionRegistry,
) -> Option<(&'r Redemption, &'r str)> {
    let id = Uuid::parse_str(reward_id.trim()).ok()?;
    redemptions
        .iter()
        .find_map(|r| r.kind_for(&id).map(|kind| (r, kind)))
}

/// Resolve a chat line and run the matching command.
pub async fn execute_command_triggers<'t, 'r>(
    text: &'t str,
    commands: &'r CommandRegistry,
    ctx: &ActionContext,
) -> Result<CommandResolution<'t, 'r>> {
    let config = ctx.stream.config();
    let cmd_char = config.chat.cmd_char.as_str();
    let Some((trigger, remainder)) = get_command_trigger(text, cmd_char) else {
        return Ok(CommandResolution {
            trigger: None,
            command: None,
        });
    };

    let Some(command) = find_command(trigger, commands, config) else {
        return Ok(CommandResolution {
            trigger: Some(trigger),
            command: None,
        });
    };

    tracing::info!("🎯 Matched command trigger: {} (trigger: {cmd_char}{trigger})", command.name);
    let args = slice_remainder(&command.takes, remainder);
    let cmd_config = config.action_config(&command.name);
    command
        .action
        .execute(ctx, &args, &cmd_config, commands, trigger)
        .await
        .map_err(|e| ZerglingError::handler(&command.name, e))?;

    Ok(CommandResolution {
        trigger: Some(trigger),
        command: Some(command),
    })
}

/// Resolve a redemption and run the matching handler with the raw message.
pub async fn execute_redemption_triggers<'r>(
    event: &RedemptionEvent,
    redemptions: &'r RedemptionRegistry,
    ctx: &ActionContext,
) -> Result<RedemptionResolution<'r>> {
    let Some((redemption, kind)) = find_redemption(&event.reward_id, redemptions) else {
        return Ok(RedemptionResolution {
            redemption: None,
            kind: None,
        });
    };

    tracing::info!("🎁 Matched redemption trigger: {} (type: {kind})", redemption.name);
    let config = ctx.stream.config().action_config(&redemption.name);
    redemption
        .action
        .execute(ctx, kind, event.message.as_deref(), &config, event)
        .await
        .map_err(|e| ZerglingError::handler(&redemption.name, e))?;

    Ok(RedemptionResolution {
        redemption: Some(redemption),
        kind: Some(kind),
    })
}
