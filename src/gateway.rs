// gateway.rs - Moderation calls against Discord
//
// The moderation core only talks to Discord through ModerationGateway, so it
// can be driven by a recording fake in tests. SerenityGateway is the live
// implementation over a serenity Context.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serenity::client::bridge::gateway::ShardId;
use serenity::client::Context;
use serenity::model::id::{GuildId, UserId};
use serenity::model::user::User;

use crate::error::{BotError, BotResult};
use crate::state::ShardManagerContainer;

/// A user as the moderation core sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    pub id: UserId,
    pub tag: String,
}

impl MemberRef {
    pub fn new(id: UserId, tag: impl Into<String>) -> Self {
        Self { id, tag: tag.into() }
    }

    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

impl From<&User> for MemberRef {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannedUser {
    pub id: UserId,
    pub name: String,
    pub tag: String,
}

#[async_trait]
pub trait ModerationGateway: Send + Sync {
    /// `None` clears an active timeout
    async fn timeout_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        duration: Option<Duration>,
        reason: &str,
    ) -> BotResult<()>;

    async fn kick_member(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> BotResult<()>;

    async fn ban_member(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> BotResult<()>;

    async fn unban_user(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> BotResult<()>;

    async fn fetch_bans(&self, guild_id: GuildId) -> BotResult<Vec<BannedUser>>;

    /// Heartbeat round trip of the current shard, if one was measured yet
    async fn latency(&self) -> Option<Duration>;
}

pub struct SerenityGateway<'a> {
    ctx: &'a Context,
}

impl<'a> SerenityGateway<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ModerationGateway for SerenityGateway<'_> {
    async fn timeout_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        duration: Option<Duration>,
        reason: &str,
    ) -> BotResult<()> {
        log::info!("[GATEWAY] timeout {} in {} for {:?} ({})", user_id, guild_id, duration, reason);

        match duration {
            Some(duration) => {
                let span = chrono::Duration::from_std(duration)
                    .map_err(|e| BotError::Validation(format!("❌ Invalid timeout duration: {}", e)))?;
                let until = (Utc::now() + span).to_rfc3339();
                guild_id
                    .edit_member(&self.ctx.http, user_id, |m| m.disable_communication_until(until))
                    .await?;
            }
            None => {
                guild_id
                    .edit_member(&self.ctx.http, user_id, |m| m.enable_communication())
                    .await?;
            }
        }
        Ok(())
    }

    async fn kick_member(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> BotResult<()> {
        log::info!("[GATEWAY] kick {} from {} ({})", user_id, guild_id, reason);
        guild_id.kick_with_reason(&self.ctx.http, user_id, reason).await?;
        Ok(())
    }

    async fn ban_member(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> BotResult<()> {
        log::info!("[GATEWAY] ban {} from {} ({})", user_id, guild_id, reason);
        guild_id.ban_with_reason(&self.ctx.http, user_id, 0, reason).await?;
        Ok(())
    }

    async fn unban_user(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> BotResult<()> {
        log::info!("[GATEWAY] unban {} in {} ({})", user_id, guild_id, reason);
        self.ctx
            .http
            .remove_ban(guild_id.0, user_id.0, Some(reason))
            .await?;
        Ok(())
    }

    async fn fetch_bans(&self, guild_id: GuildId) -> BotResult<Vec<BannedUser>> {
        let bans = guild_id.bans(&self.ctx.http).await?;
        Ok(bans
            .into_iter()
            .map(|ban| BannedUser {
                id: ban.user.id,
                tag: ban.user.tag(),
                name: ban.user.name,
            })
            .collect())
    }

    async fn latency(&self) -> Option<Duration> {
        let manager = {
            let data = self.ctx.data.read().await;
            data.get::<ShardManagerContainer>()?.clone()
        };
        let manager = manager.lock().await;
        let runners = manager.runners.lock().await;
        runners.get(&ShardId(self.ctx.shard_id)).and_then(|runner| runner.latency)
    }
}
