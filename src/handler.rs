// handler.rs - Gateway event handler
//
// Every guild message first goes through the rule engine. If the message is
// addressed to the bot (reply, mention or prefix) it is then classified and
// dispatched, and the single reply is sent back without pinging the author.
// Membership, edit/delete and channel events only feed the audit log.

use serenity::{
    async_trait,
    client::{Context, EventHandler},
    model::{
        channel::{GuildChannel, Message},
        event::MessageUpdateEvent,
        gateway::{Activity, Ready},
        guild::Member,
        id::{ChannelId, GuildId, MessageId, UserId},
        user::User,
    },
};

use crate::address::{self, Address, Envelope};
use crate::audit::{AuditSink, ChannelAuditLog};
use crate::commands::is_framework_command;
use crate::dispatch::{CommandRequest, Dispatcher};
use crate::enforcement::{enforce_rules, InboundMessage};
use crate::gateway::{MemberRef, SerenityGateway};
use crate::state::{bot_state, services};

pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

pub struct Handler {
    pub status: String,
}

/// Build the dispatcher input for a message; the bot itself is never a target.
pub fn command_request(
    msg: &Message,
    bot_id: UserId,
    text: &str,
    reply_context: Option<&str>,
) -> CommandRequest {
    CommandRequest {
        guild_id: msg.guild_id,
        actor: MemberRef::from(&msg.author),
        text: text.to_string(),
        mentions: msg
            .mentions
            .iter()
            .filter(|user| user.id != bot_id)
            .map(MemberRef::from)
            .collect(),
        channel_mentions: address::channel_mentions(&msg.content),
        reply_context: reply_context.map(str::to_string),
    }
}

/// Cut a reply down to Discord's message length limit.
pub fn truncate_for_discord(content: &str) -> String {
    if content.chars().count() <= DISCORD_MESSAGE_LIMIT {
        return content.to_string();
    }
    let mut truncated: String = content.chars().take(DISCORD_MESSAGE_LIMIT - 1).collect();
    truncated.push('…');
    truncated
}

/// Reply to a message without pinging its author.
pub async fn reply_quietly(ctx: &Context, msg: &Message, content: &str) {
    let content = truncate_for_discord(content);
    let result = msg
        .channel_id
        .send_message(&ctx.http, |m| {
            m.content(&content)
                .reference_message(msg)
                .allowed_mentions(|am| am.replied_user(false))
        })
        .await;

    if let Err(e) = result {
        log::error!("[HANDLER] Failed to reply in {}: {}", msg.channel_id, e);
    }
}

async fn audit_event(ctx: &Context, guild_id: GuildId, text: &str) {
    if let Some(state) = bot_state(ctx).await {
        ChannelAuditLog::new(ctx, &state).record(guild_id, text).await;
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        ctx.set_activity(Activity::playing(&self.status)).await;
        println!("✅ Logged in as {} (ID: {})", ready.user.tag(), ready.user.id);
        log::info!("[HANDLER] Connected to {} guilds", ready.guilds.len());
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let bot_id = ctx.cache.current_user_id();
        if msg.author.id == bot_id {
            return;
        }

        let (Some(state), Some(services)) = (bot_state(&ctx).await, services(&ctx).await) else {
            log::error!("[HANDLER] Bot state missing from client data");
            return;
        };
        let gateway = SerenityGateway::new(&ctx);
        let audit = ChannelAuditLog::new(&ctx, &state);
        let author = MemberRef::from(&msg.author);

        // Auto-moderation runs on every guild message
        if let Some(guild_id) = msg.guild_id {
            let inbound = InboundMessage {
                guild_id,
                author: &author,
                content: &msg.content,
            };
            if let Some(trigger) = enforce_rules(&state, &gateway, &audit, &inbound).await {
                if let Some(notice) = trigger.notice {
                    if let Err(e) = msg.channel_id.say(&ctx.http, notice).await {
                        log::error!("[HANDLER] Failed to post rule notice: {}", e);
                    }
                }
            }
        }

        let prefix = state.prefix().await;
        let envelope = Envelope {
            content: &msg.content,
            bot_id,
            mentions_bot: msg.mentions.iter().any(|user| user.id == bot_id),
            replied_to_bot: msg
                .referenced_message
                .as_ref()
                .filter(|referenced| referenced.author.id == bot_id)
                .map(|referenced| referenced.content.as_str()),
        };
        let Some(address) = address::resolve(&envelope, &prefix) else {
            return;
        };

        // Prefix commands registered with the framework answer for themselves
        if let Address::Prefix(text) = &address {
            if address::first_word(text).map_or(false, |word| is_framework_command(&word)) {
                return;
            }
        }

        let request = command_request(&msg, bot_id, address.text(), address.reply_context());
        let dispatcher = Dispatcher {
            state: &state,
            gateway: &gateway,
            audit: &audit,
            chat: services.chat.as_ref(),
            search: services.search.as_ref(),
        };
        let reply = dispatcher.handle(&request).await;
        reply_quietly(&ctx, &msg, &reply).await;
    }

    async fn guild_member_addition(&self, ctx: Context, new_member: Member) {
        let text = format!("📥 {} joined the server", new_member.user.tag());
        audit_event(&ctx, new_member.guild_id, &text).await;
    }

    async fn guild_member_removal(
        &self,
        ctx: Context,
        guild_id: GuildId,
        user: User,
        _member_data_if_available: Option<Member>,
    ) {
        audit_event(&ctx, guild_id, &format!("📤 {} left the server", user.tag())).await;
    }

    async fn message_update(
        &self,
        ctx: Context,
        old_if_available: Option<Message>,
        _new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        let (Some(guild_id), Some(content)) = (event.guild_id, event.content.as_ref()) else {
            return;
        };
        if event.author.as_ref().map_or(false, |author| author.bot) {
            return;
        }

        let author = event
            .author
            .as_ref()
            .map(User::tag)
            .unwrap_or_else(|| "unknown user".to_string());
        let before = old_if_available
            .map(|old| old.content)
            .unwrap_or_else(|| "(not cached)".to_string());
        let text = format!(
            "✏️ Message by {} edited in <#{}>\nBefore: {}\nAfter: {}",
            author, event.channel_id, before, content
        );
        audit_event(&ctx, guild_id, &truncate_for_discord(&text)).await;
    }

    async fn message_delete(
        &self,
        ctx: Context,
        channel_id: ChannelId,
        deleted_message_id: MessageId,
        guild_id: Option<GuildId>,
    ) {
        let Some(guild_id) = guild_id else {
            return;
        };
        // Deletions inside the log channel would otherwise echo forever
        if let Some(state) = bot_state(&ctx).await {
            if state.log_channel().await == Some(channel_id) {
                return;
            }
        }
        let text = format!("🗑️ Message {} deleted in <#{}>", deleted_message_id, channel_id);
        audit_event(&ctx, guild_id, &text).await;
    }

    async fn channel_create(&self, ctx: Context, channel: &GuildChannel) {
        let text = format!("📁 Channel created: #{}", channel.name);
        audit_event(&ctx, channel.guild_id, &text).await;
    }

    async fn channel_delete(&self, ctx: Context, channel: &GuildChannel) {
        let text = format!("🗑️ Channel deleted: #{}", channel.name);
        audit_event(&ctx, channel.guild_id, &text).await;
    }
}
