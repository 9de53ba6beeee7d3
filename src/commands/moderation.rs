// moderation.rs - Explicit mute command
//
// `mute @user [minutes]` goes through the same dispatcher path as a chat
// "mute" request, so owner gating, audit and error replies are identical.
// Only the duration differs.

use serenity::{
    client::Context,
    framework::standard::{macros::command, Args, CommandResult},
    model::channel::Message,
};

use crate::audit::ChannelAuditLog;
use crate::dispatch::{Dispatcher, DEFAULT_MUTE_MINUTES};
use crate::gateway::SerenityGateway;
use crate::handler::{command_request, reply_quietly};
use crate::state::{bot_state, services};

/// Discord caps communication timeouts at 28 days
pub const MAX_MUTE_MINUTES: u64 = 28 * 24 * 60;

/// Pull the first positive number out of the arguments as the minute
/// count. The remaining words are returned for the audit reason.
pub fn split_mute_args(args: &str) -> (u64, String) {
    let mut minutes = None;
    let mut rest = Vec::new();

    for token in args.split_whitespace() {
        match token.parse::<u64>() {
            Ok(n) if minutes.is_none() && n > 0 => minutes = Some(n.min(MAX_MUTE_MINUTES)),
            _ => rest.push(token),
        }
    }

    (minutes.unwrap_or(DEFAULT_MUTE_MINUTES), rest.join(" "))
}

#[command]
#[only_in(guilds)]
#[aliases("timeout")]
pub async fn mute(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let (Some(state), Some(services)) = (bot_state(ctx).await, services(ctx).await) else {
        return Ok(());
    };

    let (minutes, text) = split_mute_args(args.message());
    let bot_id = ctx.cache.current_user_id();
    let request = command_request(msg, bot_id, &text, None);

    let gateway = SerenityGateway::new(ctx);
    let audit = ChannelAuditLog::new(ctx, &state);
    let dispatcher = Dispatcher {
        state: &state,
        gateway: &gateway,
        audit: &audit,
        chat: services.chat.as_ref(),
        search: services.search.as_ref(),
    };

    let reply = dispatcher.mute_for(&request, minutes).await;
    reply_quietly(ctx, msg, &reply).await;
    Ok(())
}
