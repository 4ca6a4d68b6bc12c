//! # Zergling Channels
//! Where chat comes from and goes to when no chat platform client is wired in.
//!
//! - [`console`]: stdin lines in, chat lines out on stdout.
//! - [`discord`]: one-way notices to a Discord webhook.
//! - [`twitch`]: Helix lookups for the `stream_info` realm.
//! - [`ladder`]: player profiles for the `ladderinfo` task.

pub mod console;
pub mod discord;
pub mod ladder;
pub mod twitch;

pub use console::{ConsoleEvent, ConsoleReader, ConsoleSink};
pub use discord::DiscordNotifier;
pub use ladder::HttpLadderSource;
pub use twitch::HelixStreamInfo;
