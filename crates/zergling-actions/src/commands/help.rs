//! `!help` / `!commands`: list commands, or explain one.

use async_trait::async_trait;
use zergling_core::Result;

use crate::context::ActionContext;
use crate::registry::{Command, CommandAction, CommandArgs, CommandRegistry, Takes, TriggerSet};
use crate::resolver;

pub struct Help;

pub fn command() -> Command {
    Command::new("help", TriggerSet::words(&["help", "commands"]), Help)
        .takes(Takes::named(&["commandName"]))
        .help("Displays a list of commands, or more info about a specific command.")
        .system()
}

#[async_trait]
impl CommandAction for Help {
    async fn execute(
        &self,
        ctx: &ActionContext,
        args: &CommandArgs,
        _config: &toml::Value,
        commands: &CommandRegistry,
        _trigger: &str,
    ) -> Result<()> {
        let config = ctx.stream.config();
        let cmd_char = config.chat.cmd_char.as_str();

        let requested = args
            .get("commandName")
            .map(|name| name.trim())
            .map(|name| name.strip_prefix(cmd_char).unwrap_or(name))
            .filter(|name| !name.is_empty());

        let Some(name) = requested else {
            let listing: Vec<String> = commands
                .iter()
                .filter(|cmd| !cmd.is_hidden)
                .flat_map(|cmd| main_usages(cmd, cmd_char, &config.action_config(&cmd.name)))
                .collect();
            return ctx
                .reply(&format!("Available commands: {}", listing.join(", ")), true)
                .await;
        };

        // By command name first, then by any trigger word.
        let command = commands
            .get(name)
            .or_else(|| resolver::find_command(name, commands, config));
        match command {
            Some(cmd) => {
                let cmd_config = config.action_config(&cmd.name);
                ctx.reply(&describe(cmd, name, cmd_char, &cmd_config), false).await
            }
            None => ctx.reply(&format!("Command not found: \"{name}\""), true).await,
        }
    }
}

/// Usage strings for a command's main trigger(s), e.g. `!help [command-name]`.
pub fn main_usages(cmd: &Command, cmd_char: &str, cmd_config: &toml::Value) -> Vec<String> {
    cmd.triggers
        .resolve("", cmd_config, true, true)
        .iter()
        .map(|trigger| usage(cmd, trigger, cmd_char))
        .collect()
}

/// Usage string for one trigger of a command.
pub fn usage(cmd: &Command, trigger: &str, cmd_char: &str) -> String {
    let takes = match &cmd.takes {
        Takes::Remainder => " [message]".to_string(),
        Takes::Named(names) if names.is_empty() => String::new(),
        Takes::Named(names) => {
            let names: Vec<String> = names.iter().map(|n| kebab_case(n)).collect();
            format!(" [{}]", names.join(" "))
        }
    };
    format!("{cmd_char}{trigger}{takes}")
}

/// `"<usage>: <help>"` for one command. `asked` is the word the user asked
/// about; commands with configured triggers describe that trigger.
fn describe(cmd: &Command, asked: &str, cmd_char: &str, cmd_config: &toml::Value) -> String {
    let trigger = match &cmd.triggers {
        TriggerSet::Static(words) => words.first().map(String::as_str).unwrap_or(asked),
        TriggerSet::Dynamic(_) => asked,
    };
    format!("{}: {}", usage(cmd, trigger, cmd_char), cmd.help.text(asked, cmd_config))
}

/// `commandName` → `command-name`.
fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 && !out.ends_with('-') {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
        } else if ch == '_' || ch == ' ' {
            out.push('-');
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands;
    use zergling_core::ZerglingConfig;
    use zergling_stream::testing;

    fn config() -> ZerglingConfig {
        ZerglingConfig::parse(
            r#"
            [actions.discord]
            invite_link = "https://discord.gg/xyz"

            [[actions.reply.triggers]]
            triggers = ["hi", "hello"]
            reply = "Hello there!"
            help = "Says hello."
            "#,
        )
        .unwrap()
    }

    async fn run(text: &str) -> Vec<testing::Posted> {
        let dir = tempfile::tempdir().unwrap();
        let (stream, sink) = testing::interface_with(config(), dir.path(), None).unwrap();
        let registry = CommandRegistry::new(commands::builtin()).unwrap();
        let ctx = ActionContext::for_default_channel(stream);
        resolver::execute_command_triggers(text, &registry, &ctx).await.unwrap();
        sink.lines()
    }

    #[test]
    fn test_kebab_case() {
        assert_eq!(kebab_case("commandName"), "command-name");
        assert_eq!(kebab_case("search_term"), "search-term");
        assert_eq!(kebab_case("plain"), "plain");
    }

    #[tokio::test]
    async fn test_lists_visible_commands() {
        let lines = run("!help").await;
        assert_eq!(lines.len(), 1);
        assert!(lines[0].quiet);
        assert_eq!(
            lines[0].message,
            "Available commands: !help [command-name], !hi, !discord, !song"
        );
    }

    #[tokio::test]
    async fn test_describes_one_command() {
        let lines = run("!commands !song").await;
        assert_eq!(lines[0].message, "!song: Shows the song that's currently playing.");
        assert!(!lines[0].quiet);

        let by_trigger = run("!help nowplaying").await;
        assert_eq!(by_trigger[0].message, "!song: Shows the song that's currently playing.");
    }

    #[tokio::test]
    async fn test_describes_configured_reply() {
        let lines = run("!help hello").await;
        assert_eq!(lines[0].message, "!hello: Says hello.");
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let lines = run("!help frobnicate").await;
        assert_eq!(lines[0].message, "Command not found: \"frobnicate\"");
    }
}
