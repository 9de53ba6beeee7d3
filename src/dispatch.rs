// dispatch.rs - Intent dispatcher for messages addressed to the bot
//
// Every call produces exactly one reply string. Owner-only intents are gated
// before anything else, moderation intents then need a mentioned target, and
// only after both checks does a side effect happen. Moderation and admin
// changes write one audit entry each.

use std::time::Duration;

use serenity::model::id::{ChannelId, GuildId};

use crate::audit::AuditSink;
use crate::chat::{ChatBackend, CHAT_FAILURE_REPLY};
use crate::error::{BotError, BotResult};
use crate::gateway::{MemberRef, ModerationGateway};
use crate::intent::{classify, Intent};
use crate::rules::parse_rule;
use crate::search::{format_search_results, SearchBackend, DEFAULT_MAX_RESULTS};
use crate::state::BotState;

pub const DEFAULT_MUTE_MINUTES: u64 = 10;
const DEFAULT_REASON: &str = "No reason provided";
pub const UNKNOWN_ACTION_REPLY: &str = "❌ Unable to determine action.";

/// An addressed message, already stripped of the address token.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub guild_id: Option<GuildId>,
    pub actor: MemberRef,
    /// Text as typed, minus the bot mention or prefix
    pub text: String,
    /// Mentioned users in message order, bot excluded
    pub mentions: Vec<MemberRef>,
    pub channel_mentions: Vec<ChannelId>,
    /// Text of the bot message being replied to, if any
    pub reply_context: Option<String>,
}

pub fn owner_denial(intent: Intent) -> String {
    format!("❌ '{}' requires owner permissions!", intent)
}

pub fn missing_target(intent: Intent) -> String {
    format!("❌ You must mention a member to {}!", intent.as_str().to_lowercase())
}

/// Text minus the target's mention token, or the default reason
pub fn derive_reason(text: &str, target: &MemberRef) -> String {
    let stripped = crate::address::strip_user_mention(text, target.id);
    let reason = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if reason.is_empty() {
        DEFAULT_REASON.to_string()
    } else {
        reason
    }
}

pub struct Dispatcher<'a> {
    pub state: &'a BotState,
    pub gateway: &'a dyn ModerationGateway,
    pub audit: &'a dyn AuditSink,
    pub chat: &'a dyn ChatBackend,
    pub search: &'a dyn SearchBackend,
}

impl<'a> Dispatcher<'a> {
    /// Classify the request text and dispatch it.
    pub async fn handle(&self, request: &CommandRequest) -> String {
        let intent = classify(&request.text);
        log::info!("[DISPATCH] {} from {} classified as {}", request.text, request.actor.tag, intent);
        self.dispatch(intent, request).await
    }

    pub async fn dispatch(&self, intent: Intent, request: &CommandRequest) -> String {
        let result = self.try_dispatch(intent, request, DEFAULT_MUTE_MINUTES).await;
        self.render(intent, result)
    }

    /// Explicit `mute @user <minutes>` command path
    pub async fn mute_for(&self, request: &CommandRequest, minutes: u64) -> String {
        let result = self.try_dispatch(Intent::Mute, request, minutes).await;
        self.render(Intent::Mute, result)
    }

    fn render(&self, intent: Intent, result: BotResult<String>) -> String {
        match result {
            Ok(reply) => reply,
            Err(BotError::PermissionDenied(reason)) => {
                log::warn!("[DISPATCH] Discord refused {}: {}", intent, reason);
                format!("❌ No permission to perform {}!", intent)
            }
            Err(BotError::Validation(message)) => message,
            Err(e) => {
                log::error!("[DISPATCH] Error while handling {}: {}", intent, e);
                format!("❌ Error: {}", e)
            }
        }
    }

    async fn try_dispatch(
        &self,
        intent: Intent,
        request: &CommandRequest,
        mute_minutes: u64,
    ) -> BotResult<String> {
        if intent.requires_owner() && !self.state.is_owner(request.actor.id) {
            log::info!("[DISPATCH] Denied {} for non-owner {}", intent, request.actor.tag);
            return Ok(owner_denial(intent));
        }

        match intent {
            Intent::Kick | Intent::Ban | Intent::Mute | Intent::Unmute => {
                self.moderate(intent, request, mute_minutes).await
            }
            Intent::SetLogs => self.set_logs(request).await,
            Intent::SetPrefix => self.set_prefix(request).await,
            Intent::Rules => self.define_rule(request).await,
            Intent::Ping => {
                let latency = self.gateway.latency().await.unwrap_or(Duration::ZERO);
                Ok(format!("Pong! {}ms", latency.as_millis()))
            }
            Intent::WhoAmI => Ok(if self.state.is_owner(request.actor.id) {
                "Hey ♕Master, you are an owner!".to_string()
            } else {
                "You are a member.".to_string()
            }),
            Intent::Search => self.search(request).await,
            Intent::Chat => Ok(self.chat(request).await),
        }
    }

    async fn moderate(
        &self,
        intent: Intent,
        request: &CommandRequest,
        mute_minutes: u64,
    ) -> BotResult<String> {
        let guild_id = request
            .guild_id
            .ok_or_else(|| BotError::Validation("❌ This command can only be used in a server.".to_string()))?;
        let target = request
            .mentions
            .first()
            .ok_or_else(|| BotError::Validation(missing_target(intent)))?;
        let reason = derive_reason(&request.text, target);

        let reply = match intent {
            Intent::Kick => {
                self.gateway.kick_member(guild_id, target.id, &reason).await?;
                format!("Kicked {}", target.tag)
            }
            Intent::Ban => {
                self.gateway.ban_member(guild_id, target.id, &reason).await?;
                format!("Banned {}", target.tag)
            }
            Intent::Mute => {
                let duration = Duration::from_secs(mute_minutes * 60);
                self.gateway
                    .timeout_member(guild_id, target.id, Some(duration), &reason)
                    .await?;
                format!("Muted {} for {} mins", target.tag, mute_minutes)
            }
            Intent::Unmute => {
                self.gateway.timeout_member(guild_id, target.id, None, &reason).await?;
                format!("Unmuted {}", target.tag)
            }
            _ => return Ok(UNKNOWN_ACTION_REPLY.to_string()),
        };

        self.audit
            .record(
                guild_id,
                &format!("{} by {}: {} (reason: {})", intent, request.actor.tag, target.tag, reason),
            )
            .await;
        Ok(reply)
    }

    async fn set_logs(&self, request: &CommandRequest) -> BotResult<String> {
        let channel_id = *request.channel_mentions.first().ok_or_else(|| {
            BotError::Validation("❌ You must mention a channel to use for logs!".to_string())
        })?;

        self.state.set_log_channel(channel_id).await;
        log::info!("[DISPATCH] Log channel set to {} by {}", channel_id, request.actor.tag);
        if let Some(guild_id) = request.guild_id {
            self.audit
                .record(guild_id, &format!("Log channel set to <#{}> by {}", channel_id, request.actor.tag))
                .await;
        }
        Ok(format!("✅ Log channel set to <#{}>", channel_id))
    }

    async fn set_prefix(&self, request: &CommandRequest) -> BotResult<String> {
        // First token after the "set prefix" keywords
        let prefix = request.text.split_whitespace().nth(2).ok_or_else(|| {
            BotError::Validation("❌ You must provide a new prefix!".to_string())
        })?;

        self.state.set_prefix(prefix).await;
        log::info!("[DISPATCH] Prefix set to '{}' by {}", prefix, request.actor.tag);
        if let Some(guild_id) = request.guild_id {
            self.audit
                .record(guild_id, &format!("Prefix set to `{}` by {}", prefix, request.actor.tag))
                .await;
        }
        Ok(format!("✅ Updated prefix to `{}`", prefix))
    }

    async fn define_rule(&self, request: &CommandRequest) -> BotResult<String> {
        let rule = parse_rule(&request.text)
            .ok_or_else(|| BotError::Validation("❌ Failed to parse rule.".to_string()))?;

        let reply = format!("✅ Added rule: {}", rule);
        log::info!("[DISPATCH] Rule added by {}: {}", request.actor.tag, rule);
        if let Some(guild_id) = request.guild_id {
            self.audit
                .record(guild_id, &format!("Rule added by {}: {}", request.actor.tag, rule))
                .await;
        }
        self.state.add_rule(rule).await;
        Ok(reply)
    }

    async fn search(&self, request: &CommandRequest) -> BotResult<String> {
        let query = request.text.trim();
        let query = query
            .get(..6)
            .filter(|head| head.eq_ignore_ascii_case("search"))
            .map(|_| query[6..].trim())
            .unwrap_or(query);

        if query.is_empty() {
            return Err(BotError::Validation("❌ Please tell me what to search for!".to_string()));
        }

        match self.search.search(query, DEFAULT_MAX_RESULTS).await {
            Ok(results) => Ok(format_search_results(&results)),
            Err(e) => {
                log::error!("[DISPATCH] Search failed for '{}': {}", query, e);
                Ok("❌ Search is unavailable right now.".to_string())
            }
        }
    }

    async fn chat(&self, request: &CommandRequest) -> String {
        let input = match &request.reply_context {
            Some(context) => format!("You are replying to: '{}'\nUser: '{}'", context, request.text),
            None => request.text.clone(),
        };

        let window = self.state.record_user_turn(request.actor.id, &input).await;
        match self.chat.complete(&window).await {
            Ok(reply) => {
                self.state.record_ai_turn(request.actor.id, &reply).await;
                reply
            }
            Err(e) => {
                log::error!("[DISPATCH] Chat backend error: {}", e);
                CHAT_FAILURE_REPLY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Rule, RuleAction};
    use crate::search::SearchResult;
    use crate::testing::{FakeAudit, FakeChat, FakeGateway, FakeSearch, GatewayCall};
    use serenity::model::id::UserId;

    const OWNER: UserId = UserId(1);
    const MEMBER: UserId = UserId(2);
    const TARGET: UserId = UserId(3);

    struct Harness {
        state: BotState,
        gateway: FakeGateway,
        audit: FakeAudit,
        chat: FakeChat,
        search: FakeSearch,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_gateway(FakeGateway::default())
        }

        fn with_gateway(gateway: FakeGateway) -> Self {
            Self {
                state: BotState::new([OWNER].into_iter().collect(), "!", None),
                gateway,
                audit: FakeAudit::default(),
                chat: FakeChat { reply: Some("hello human".to_string()), ..FakeChat::default() },
                search: FakeSearch::default(),
            }
        }

        fn dispatcher(&self) -> Dispatcher<'_> {
            Dispatcher {
                state: &self.state,
                gateway: &self.gateway,
                audit: &self.audit,
                chat: &self.chat,
                search: &self.search,
            }
        }
    }

    fn request(actor: UserId, text: &str) -> CommandRequest {
        CommandRequest {
            guild_id: Some(GuildId(10)),
            actor: MemberRef::new(actor, format!("user#{:04}", actor.0)),
            text: text.to_string(),
            mentions: Vec::new(),
            channel_mentions: Vec::new(),
            reply_context: None,
        }
    }

    fn with_target(mut request: CommandRequest) -> CommandRequest {
        request.mentions.push(MemberRef::new(TARGET, "target#0003"));
        request
    }

    #[tokio::test]
    async fn test_non_owner_is_denied_without_side_effects() {
        let harness = Harness::new();
        let cases = [
            ("kick <@3>", "KICK"),
            ("ban <@3>", "BAN"),
            ("mute <@3>", "MUTE"),
            ("unmute <@3>", "UNMUTE"),
            ("set logs <#5>", "SET LOGS"),
            ("set prefix ?", "SET PREFIX"),
            ("rule mute badword", "RULES"),
        ];

        for (text, tag) in cases {
            let mut req = with_target(request(MEMBER, text));
            req.channel_mentions.push(ChannelId(5));
            let reply = harness.dispatcher().handle(&req).await;
            assert_eq!(reply, format!("❌ '{}' requires owner permissions!", tag));
        }

        assert!(harness.gateway.calls().is_empty());
        assert!(harness.audit.entries().is_empty());
        assert!(harness.state.rules().await.is_empty());
        assert_eq!(harness.state.prefix().await, "!");
        assert_eq!(harness.state.log_channel().await, None);
    }

    #[tokio::test]
    async fn test_moderation_without_target_is_usage_error() {
        let harness = Harness::new();
        for (text, verb) in [("kick", "kick"), ("ban spammer", "ban"), ("mute", "mute"), ("unmute", "unmute")] {
            let reply = harness.dispatcher().handle(&request(OWNER, text)).await;
            assert_eq!(reply, format!("❌ You must mention a member to {}!", verb));
        }
        assert!(harness.gateway.calls().is_empty());
        assert!(harness.audit.entries().is_empty());
    }

    #[tokio::test]
    async fn test_kick_uses_derived_reason_and_audits_once() {
        let harness = Harness::new();
        let reply = harness
            .dispatcher()
            .handle(&with_target(request(OWNER, "kick <@3> spamming links")))
            .await;

        assert_eq!(reply, "Kicked target#0003");
        assert_eq!(
            harness.gateway.calls(),
            vec![GatewayCall::Kick(TARGET, "kick spamming links".to_string())]
        );
        assert_eq!(harness.audit.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_ban_default_reason() {
        let harness = Harness::new();
        let req = with_target(request(OWNER, "<@!3>"));
        let reply = harness.dispatcher().dispatch(Intent::Ban, &req).await;
        assert_eq!(reply, "Banned target#0003");
        assert_eq!(
            harness.gateway.calls(),
            vec![GatewayCall::Ban(TARGET, "No reason provided".to_string())]
        );
    }

    #[tokio::test]
    async fn test_chat_mute_is_ten_minutes() {
        let harness = Harness::new();
        let reply = harness.dispatcher().handle(&with_target(request(OWNER, "mute <@3>"))).await;
        assert_eq!(reply, "Muted target#0003 for 10 mins");
        assert_eq!(
            harness.gateway.calls(),
            vec![GatewayCall::Timeout(TARGET, Some(Duration::from_secs(600)))]
        );
    }

    #[tokio::test]
    async fn test_explicit_mute_uses_caller_minutes() {
        let harness = Harness::new();
        let reply = harness.dispatcher().mute_for(&with_target(request(OWNER, "<@3> 25")), 25).await;
        assert_eq!(reply, "Muted target#0003 for 25 mins");
        assert_eq!(
            harness.gateway.calls(),
            vec![GatewayCall::Timeout(TARGET, Some(Duration::from_secs(25 * 60)))]
        );
    }

    #[tokio::test]
    async fn test_unmute_clears_timeout() {
        let harness = Harness::new();
        let reply = harness.dispatcher().handle(&with_target(request(OWNER, "unmute <@3>"))).await;
        assert_eq!(reply, "Unmuted target#0003");
        assert_eq!(harness.gateway.calls(), vec![GatewayCall::Timeout(TARGET, None)]);
    }

    #[tokio::test]
    async fn test_platform_denial_is_reported() {
        let harness = Harness::with_gateway(FakeGateway::forbidden());
        let reply = harness.dispatcher().handle(&with_target(request(OWNER, "ban <@3>"))).await;
        assert_eq!(reply, "❌ No permission to perform BAN!");
        assert!(harness.audit.entries().is_empty());
    }

    #[test]
    fn test_reason_whitespace_is_collapsed() {
        let target = MemberRef::new(TARGET, "target#0003");
        assert_eq!(derive_reason("ban <@3>   raiding", &target), "ban raiding");
        assert_eq!(derive_reason("  <@3> ", &target), "No reason provided");
    }

    #[tokio::test]
    async fn test_moderate_rejects_non_moderation_intent() {
        let harness = Harness::new();
        let reply = harness
            .dispatcher()
            .moderate(Intent::Ping, &with_target(request(OWNER, "ping")), DEFAULT_MUTE_MINUTES)
            .await
            .unwrap();
        assert_eq!(reply, UNKNOWN_ACTION_REPLY);
        assert!(harness.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_moderation_in_dm_is_rejected() {
        let harness = Harness::new();
        let mut req = with_target(request(OWNER, "kick <@3>"));
        req.guild_id = None;
        let reply = harness.dispatcher().handle(&req).await;
        assert_eq!(reply, "❌ This command can only be used in a server.");
        assert!(harness.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_set_prefix_updates_state() {
        let harness = Harness::new();
        let reply = harness.dispatcher().handle(&request(OWNER, "set prefix ?")).await;
        assert_eq!(reply, "✅ Updated prefix to `?`");
        assert_eq!(harness.state.prefix().await, "?");

        let reply = harness.dispatcher().handle(&request(OWNER, "set prefix")).await;
        assert_eq!(reply, "❌ You must provide a new prefix!");
        assert_eq!(harness.state.prefix().await, "?");
    }

    #[tokio::test]
    async fn test_set_logs_requires_channel_mention() {
        let harness = Harness::new();
        let reply = harness.dispatcher().handle(&request(OWNER, "set logs here")).await;
        assert_eq!(reply, "❌ You must mention a channel to use for logs!");
        assert_eq!(harness.state.log_channel().await, None);

        let mut req = request(OWNER, "set logs <#55>");
        req.channel_mentions.push(ChannelId(55));
        let reply = harness.dispatcher().handle(&req).await;
        assert_eq!(reply, "✅ Log channel set to <#55>");
        assert_eq!(harness.state.log_channel().await, Some(ChannelId(55)));
    }

    #[tokio::test]
    async fn test_rule_definition_appends_and_confirms() {
        let harness = Harness::new();
        let reply = harness.dispatcher().handle(&request(OWNER, "rule mute badword")).await;
        assert_eq!(reply, "✅ Added rule: If message contains badword then MUTE");
        assert_eq!(
            harness.state.rules().await,
            vec![Rule::new("message contains badword", RuleAction::Mute)]
        );
    }

    #[tokio::test]
    async fn test_unparsable_rule_leaves_store_alone() {
        let harness = Harness::new();
        let reply = harness.dispatcher().handle(&request(OWNER, "rule no swearing")).await;
        assert_eq!(reply, "❌ Failed to parse rule.");
        assert!(harness.state.rules().await.is_empty());
    }

    #[tokio::test]
    async fn test_ping_reports_latency() {
        let harness = Harness::with_gateway(FakeGateway {
            latency: Some(Duration::from_millis(87)),
            ..FakeGateway::default()
        });
        let reply = harness.dispatcher().handle(&request(MEMBER, "ping")).await;
        assert_eq!(reply, "Pong! 87ms");

        let harness = Harness::new();
        let reply = harness.dispatcher().handle(&request(MEMBER, "ping")).await;
        assert_eq!(reply, "Pong! 0ms");
    }

    #[tokio::test]
    async fn test_who_am_i() {
        let harness = Harness::new();
        assert_eq!(
            harness.dispatcher().handle(&request(OWNER, "who am i")).await,
            "Hey ♕Master, you are an owner!"
        );
        assert_eq!(
            harness.dispatcher().handle(&request(MEMBER, "so who am i?")).await,
            "You are a member."
        );
    }

    #[tokio::test]
    async fn test_search_formats_results() {
        let mut harness = Harness::new();
        harness.search.results = vec![
            SearchResult::new("Rust", "https://www.rust-lang.org/"),
            SearchResult::new("Tokio", "https://tokio.rs/"),
        ];
        let reply = harness.dispatcher().handle(&request(MEMBER, "Search rust runtimes")).await;
        assert_eq!(
            reply,
            "🔍 Search results:\n- Rust (https://www.rust-lang.org/)\n- Tokio (https://tokio.rs/)"
        );
        let queries = harness.search.queries.lock().unwrap().clone();
        assert_eq!(queries, vec!["rust runtimes".to_string()]);
    }

    #[tokio::test]
    async fn test_search_without_results() {
        let harness = Harness::new();
        let reply = harness.dispatcher().handle(&request(MEMBER, "search zzzz")).await;
        assert_eq!(reply, "🔍 Search results:\nNo results found.");
    }

    #[tokio::test]
    async fn test_search_backend_failure() {
        let mut harness = Harness::new();
        harness.search.fail = true;
        let reply = harness.dispatcher().handle(&request(MEMBER, "search rust")).await;
        assert_eq!(reply, "❌ Search is unavailable right now.");
    }

    #[tokio::test]
    async fn test_empty_search_query_is_rejected() {
        let harness = Harness::new();
        let reply = harness.dispatcher().handle(&request(MEMBER, "search   ")).await;
        assert_eq!(reply, "❌ Please tell me what to search for!");
        assert!(harness.search.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_failure_is_reported_as_error() {
        let harness = Harness::with_gateway(FakeGateway::unavailable());
        let reply = harness.dispatcher().handle(&with_target(request(OWNER, "kick <@3>"))).await;
        assert_eq!(reply, "❌ Error: external service error: Discord is unavailable");
        assert!(harness.audit.entries().is_empty());
    }

    #[tokio::test]
    async fn test_chat_records_history() {
        let harness = Harness::new();
        let reply = harness.dispatcher().handle(&request(MEMBER, "how are you")).await;
        assert_eq!(reply, "hello human");
        assert_eq!(harness.state.history_len(MEMBER).await, 2);

        let seen = harness.chat.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![vec!["User: how are you".to_string()]]);
    }

    #[tokio::test]
    async fn test_chat_with_reply_context() {
        let harness = Harness::new();
        let mut req = request(MEMBER, "why?");
        req.reply_context = Some("Pong! 40ms".to_string());
        harness.dispatcher().handle(&req).await;
        let seen = harness.chat.seen.lock().unwrap().clone();
        assert_eq!(seen[0][0], "User: You are replying to: 'Pong! 40ms'\nUser: 'why?'");
    }

    #[tokio::test]
    async fn test_chat_failure_uses_fixed_reply() {
        let mut harness = Harness::new();
        harness.chat.reply = None;
        let reply = harness.dispatcher().handle(&request(MEMBER, "tell me a joke")).await;
        assert_eq!(reply, CHAT_FAILURE_REPLY);
        // Only the user turn is kept when the backend fails
        assert_eq!(harness.state.history_len(MEMBER).await, 1);
    }
}
