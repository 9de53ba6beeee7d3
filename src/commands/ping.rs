// ping.rs - Gateway heartbeat latency

use serenity::{
    client::Context,
    framework::standard::{macros::command, Args, CommandResult},
    model::channel::Message,
};

use crate::gateway::{ModerationGateway, SerenityGateway};

#[command]
/// Reports the shard heartbeat latency, 0ms until the first heartbeat
pub async fn ping(ctx: &Context, msg: &Message, _args: Args) -> CommandResult {
    let latency = SerenityGateway::new(ctx).latency().await.unwrap_or_default();
    msg.reply(ctx, format!("Pong! {}ms", latency.as_millis())).await?;
    Ok(())
}
