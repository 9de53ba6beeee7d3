// help.rs - Command overview

use serenity::{
    client::Context,
    framework::standard::{macros::command, CommandResult},
    model::channel::Message,
};

use crate::state::bot_state;

pub fn help_text(prefix: &str) -> String {
    format!(
        r#"**🛡️ Warden - Command Help**

**📝 Prefix commands:**
• `{p}ping` - Gateway latency
• `{p}mute @user [minutes]` - Time out a member (owner only, default 10 minutes)
• `{p}shutdown` - Disconnect the bot (owner only)
• `{p}help` - Show this message

**💬 Talk to me** by mentioning me, replying to me, or starting with `{p}`:
• `kick @user [reason]`, `ban @user [reason]`, `mute @user`, `unmute @user`
• `set logs #channel`, `set prefix <new>`
• `rule mute <word>` - Time out anyone who says <word>
• `rule kick` - Kick owners' messages, `rule ban` - Ban abuse words
• `search <query>`, `who am i`, `ping`
• Anything else is an AI chat reply"#,
        p = prefix
    )
}

#[command]
#[aliases("commands")]
pub async fn help(ctx: &Context, msg: &Message) -> CommandResult {
    let prefix = match bot_state(ctx).await {
        Some(state) => state.prefix().await,
        None => crate::config::DEFAULT_PREFIX.to_string(),
    };
    msg.reply(ctx, help_text(&prefix)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_uses_current_prefix() {
        let text = help_text("?");
        assert!(text.contains("`?ping`"));
        assert!(text.contains("`?mute @user [minutes]`"));
        assert!(!text.contains("{p}"));
    }
}
