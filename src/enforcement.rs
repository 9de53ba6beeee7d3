// enforcement.rs - Execute the first matching rule against a message author
//
// Evaluation itself is pure (rules.rs). This module runs the matched rule's
// action through the gateway, builds the channel notice and writes exactly
// one audit entry. A platform permission failure turns into a notice; the
// rule still counts as triggered.

use std::time::Duration;

use serenity::model::id::GuildId;

use crate::audit::AuditSink;
use crate::error::BotResult;
use crate::gateway::{MemberRef, ModerationGateway};
use crate::rules::{Rule, RuleAction};
use crate::state::BotState;

pub const RULE_MUTE_DURATION: Duration = Duration::from_secs(10 * 60);
const RULE_REASON: &str = "Rule violation";

/// Outcome of a triggered rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTrigger {
    pub rule: Rule,
    /// Channel notice to post; None only when UNBAN found nobody to unban
    pub notice: Option<String>,
}

/// Message as seen by the rule engine
pub struct InboundMessage<'a> {
    pub guild_id: GuildId,
    pub author: &'a MemberRef,
    pub content: &'a str,
}

pub async fn enforce_rules(
    state: &BotState,
    gateway: &dyn ModerationGateway,
    audit: &dyn AuditSink,
    message: &InboundMessage<'_>,
) -> Option<RuleTrigger> {
    let author_is_owner = state.is_owner(message.author.id);
    let rule = state.first_matching_rule(message.content, author_is_owner).await?;

    log::info!(
        "[RULES] '{}' matched message from {} in guild {}",
        rule,
        message.author.tag,
        message.guild_id
    );

    let notice = match execute(gateway, &rule, message).await {
        Ok(notice) => notice,
        Err(e) if e.is_permission_denied() => {
            log::warn!("[RULES] Missing permission for {}: {}", rule.action, e);
            Some(format!("❌ No permission to perform {}!", rule.action))
        }
        Err(e) => {
            log::error!("[RULES] Failed to perform {} on {}: {}", rule.action, message.author.tag, e);
            Some(format!("❌ Error: {}", e))
        }
    };

    audit
        .record(
            message.guild_id,
            &format!("Rule triggered: {} → {}", rule, message.author.tag),
        )
        .await;

    Some(RuleTrigger { rule, notice })
}

async fn execute(
    gateway: &dyn ModerationGateway,
    rule: &Rule,
    message: &InboundMessage<'_>,
) -> BotResult<Option<String>> {
    let guild_id = message.guild_id;
    let author = message.author;
    let condition = &rule.condition;

    let notice = match rule.action {
        RuleAction::Mute => {
            gateway
                .timeout_member(guild_id, author.id, Some(RULE_MUTE_DURATION), RULE_REASON)
                .await?;
            format!("⏱️ {} muted (rule: {})", author.mention(), condition)
        }
        RuleAction::Unmute => {
            gateway.timeout_member(guild_id, author.id, None, RULE_REASON).await?;
            format!("✅ {} unmuted (rule: {})", author.mention(), condition)
        }
        RuleAction::Kick => {
            gateway.kick_member(guild_id, author.id, RULE_REASON).await?;
            format!("👢 {} kicked (rule: {})", author.mention(), condition)
        }
        RuleAction::Ban => {
            gateway.ban_member(guild_id, author.id, RULE_REASON).await?;
            format!("🔨 {} banned (rule: {})", author.mention(), condition)
        }
        RuleAction::Unban => {
            let content = message.content.to_lowercase();
            let bans = gateway.fetch_bans(guild_id).await?;
            let Some(banned) = bans
                .into_iter()
                .find(|ban| !ban.name.is_empty() && content.contains(&ban.name.to_lowercase()))
            else {
                return Ok(None);
            };
            gateway
                .unban_user(guild_id, banned.id, "Rule violation - UNBAN")
                .await?;
            format!("✅ Unbanned {} (rule: {})", banned.tag, condition)
        }
    };
    Ok(Some(notice))
}
