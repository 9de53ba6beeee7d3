// audit.rs - Best-effort audit log channel
//
// Entries go to the configured log channel when that channel belongs to the
// guild the event happened in. Delivery failures are logged and dropped.

use async_trait::async_trait;
use serenity::client::Context;
use serenity::model::id::GuildId;

use crate::state::BotState;

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, guild_id: GuildId, text: &str);
}

pub struct ChannelAuditLog<'a> {
    ctx: &'a Context,
    state: &'a BotState,
}

impl<'a> ChannelAuditLog<'a> {
    pub fn new(ctx: &'a Context, state: &'a BotState) -> Self {
        Self { ctx, state }
    }
}

#[async_trait]
impl AuditSink for ChannelAuditLog<'_> {
    async fn record(&self, guild_id: GuildId, text: &str) {
        let Some(channel_id) = self.state.log_channel().await else {
            return;
        };

        // Only post into a log channel that lives in the same guild
        let in_guild = self
            .ctx
            .cache
            .guild_channel(channel_id)
            .map(|channel| channel.guild_id == guild_id)
            .unwrap_or(false);
        if !in_guild {
            log::debug!("[AUDIT] log channel {} is not part of guild {}", channel_id, guild_id);
            return;
        }

        if let Err(e) = channel_id.say(&self.ctx.http, text).await {
            log::warn!("[AUDIT] Failed to write audit entry to {}: {}", channel_id, e);
        }
    }
}
