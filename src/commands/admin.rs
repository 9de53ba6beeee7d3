// admin.rs - Owner-only bot management

use serenity::{
    client::Context,
    framework::standard::{macros::command, Args, CommandResult},
    model::channel::Message,
};

use crate::state::{bot_state, ShardManagerContainer};

#[command]
#[aliases("stop")]
/// Disconnect every shard and let main() return
pub async fn shutdown(ctx: &Context, msg: &Message, _args: Args) -> CommandResult {
    let Some(state) = bot_state(ctx).await else {
        return Ok(());
    };

    if !state.is_owner(msg.author.id) {
        msg.reply(ctx, "❌ Only a bot owner can shut me down!").await?;
        return Ok(());
    }

    msg.channel_id.say(&ctx.http, "Shutting down...").await?;
    log::info!("[ADMIN] Shutdown requested by {} ({})", msg.author.tag(), msg.author.id);

    let manager = ctx.data.read().await.get::<ShardManagerContainer>().cloned();
    match manager {
        Some(manager) => manager.lock().await.shutdown_all().await,
        None => log::error!("[ADMIN] Shard manager missing from client data"),
    }
    Ok(())
}
