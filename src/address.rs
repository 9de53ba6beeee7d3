// address.rs - Decide whether a message is addressed to the bot
//
// A message is addressed when it replies to one of the bot's messages, when
// it mentions the bot, or when it starts with the current command prefix
// (checked in that order). The returned text has the address token removed.

use once_cell::sync::Lazy;
use regex::Regex;
use serenity::model::id::{ChannelId, UserId};

static CHANNEL_MENTION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<#(\d+)>").expect("Invalid channel mention regex pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// Reply to a bot message; carries the replied-to text
    Reply { text: String, context: String },
    Mention(String),
    Prefix(String),
}

impl Address {
    pub fn text(&self) -> &str {
        match self {
            Address::Reply { text, .. } => text,
            Address::Mention(text) | Address::Prefix(text) => text,
        }
    }

    pub fn reply_context(&self) -> Option<&str> {
        match self {
            Address::Reply { context, .. } => Some(context),
            _ => None,
        }
    }
}

/// Everything the addressing decision needs to know about a message.
pub struct Envelope<'a> {
    pub content: &'a str,
    pub bot_id: UserId,
    pub mentions_bot: bool,
    /// Content of the referenced message when it was written by the bot
    pub replied_to_bot: Option<&'a str>,
}

/// Remove both `<@id>` and `<@!id>` forms of a user mention.
pub fn strip_user_mention(content: &str, user_id: UserId) -> String {
    content
        .replace(&format!("<@!{}>", user_id), "")
        .replace(&format!("<@{}>", user_id), "")
        .trim()
        .to_string()
}

pub fn resolve(envelope: &Envelope<'_>, prefix: &str) -> Option<Address> {
    let address = if let Some(context) = envelope.replied_to_bot {
        Address::Reply {
            text: strip_user_mention(envelope.content, envelope.bot_id),
            context: context.to_string(),
        }
    } else if envelope.mentions_bot {
        Address::Mention(strip_user_mention(envelope.content, envelope.bot_id))
    } else if !prefix.is_empty() && envelope.content.starts_with(prefix) {
        Address::Prefix(envelope.content[prefix.len()..].trim().to_string())
    } else {
        return None;
    };

    if address.text().is_empty() {
        return None;
    }
    Some(address)
}

/// Channel ids mentioned as `<#id>`, in message order.
pub fn channel_mentions(content: &str) -> Vec<ChannelId> {
    CHANNEL_MENTION_REGEX
        .captures_iter(content)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u64>().ok())
        .map(ChannelId)
        .collect()
}

/// First whitespace-separated word, lower-cased
pub fn first_word(text: &str) -> Option<String> {
    text.split_whitespace().next().map(|w| w.to_lowercase())
}
