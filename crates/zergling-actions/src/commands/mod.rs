//! Built-in chat commands.

pub mod discord;
pub mod help;
pub mod reply;
pub mod song;

use crate::registry::Command;

/// The bot's commands, in match order.
pub fn builtin() -> Vec<Command> {
    vec![help::command(), reply::command(), discord::command(), song::command()]
}
