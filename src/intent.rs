// intent.rs - Keyword intent classifier
//
// Maps the lower-cased, address-stripped text of a message to one intent.
// The table order is the precedence: a message starting with "mute" is MUTE
// even though it also contains "mute" for the RULES row further down.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Kick,
    Ban,
    Mute,
    Unmute,
    Search,
    Ping,
    WhoAmI,
    SetLogs,
    SetPrefix,
    Rules,
    Chat,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Kick => "KICK",
            Intent::Ban => "BAN",
            Intent::Mute => "MUTE",
            Intent::Unmute => "UNMUTE",
            Intent::Search => "SEARCH",
            Intent::Ping => "PING",
            Intent::WhoAmI => "WHO AM I",
            Intent::SetLogs => "SET LOGS",
            Intent::SetPrefix => "SET PREFIX",
            Intent::Rules => "RULES",
            Intent::Chat => "CHAT",
        }
    }

    /// Kick / ban / mute / unmute: needs a mentioned target member
    pub fn is_moderation(&self) -> bool {
        matches!(self, Intent::Kick | Intent::Ban | Intent::Mute | Intent::Unmute)
    }

    pub fn requires_owner(&self) -> bool {
        self.is_moderation()
            || matches!(self, Intent::SetLogs | Intent::SetPrefix | Intent::Rules)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
enum Matcher {
    StartsWith(&'static str),
    Contains(&'static str),
    AnyOf(&'static [Matcher]),
}

impl Matcher {
    fn test(&self, text: &str) -> bool {
        match self {
            Matcher::StartsWith(prefix) => text.starts_with(prefix),
            Matcher::Contains(needle) => text.contains(needle),
            Matcher::AnyOf(matchers) => matchers.iter().any(|m| m.test(text)),
        }
    }
}

const INTENT_TABLE: &[(Matcher, Intent)] = &[
    (Matcher::StartsWith("kick"), Intent::Kick),
    (Matcher::StartsWith("ban"), Intent::Ban),
    (Matcher::StartsWith("mute"), Intent::Mute),
    (Matcher::StartsWith("unmute"), Intent::Unmute),
    (Matcher::StartsWith("search"), Intent::Search),
    (Matcher::StartsWith("ping"), Intent::Ping),
    (Matcher::Contains("who am i"), Intent::WhoAmI),
    (Matcher::StartsWith("set logs"), Intent::SetLogs),
    (Matcher::StartsWith("set prefix"), Intent::SetPrefix),
    (
        Matcher::AnyOf(&[
            Matcher::StartsWith("rule"),
            Matcher::Contains("mute"),
            Matcher::Contains("ban"),
        ]),
        Intent::Rules,
    ),
];

/// Classify a message. Anything unmatched falls through to CHAT.
pub fn classify(text: &str) -> Intent {
    let text = text.trim().to_lowercase();
    INTENT_TABLE
        .iter()
        .find(|(matcher, _)| matcher.test(&text))
        .map(|(_, intent)| *intent)
        .unwrap_or(Intent::Chat)
}
