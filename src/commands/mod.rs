// commands/mod.rs - Prefix commands registered with the standard framework
//
// Everything else the bot understands goes through handler.rs and the
// intent classifier. Text whose first word names one of these commands is
// left to the framework so it is never answered twice.

pub mod admin; // Owner-only shutdown
pub mod help; // Command overview
pub mod moderation; // Explicit mute with a minute count
pub mod ping; // Gateway latency

use serenity::framework::standard::macros::group;

use crate::commands::admin::SHUTDOWN_COMMAND;
use crate::commands::help::HELP_COMMAND;
use crate::commands::moderation::MUTE_COMMAND;
use crate::commands::ping::PING_COMMAND;

#[group]
#[commands(ping, shutdown, mute, help)]
pub struct General;

/// Whether the framework answers to this word, by name or alias.
pub fn is_framework_command(word: &str) -> bool {
    GENERAL_GROUP
        .options
        .commands
        .iter()
        .flat_map(|command| command.options.names.iter())
        .any(|name| name.eq_ignore_ascii_case(word))
}
