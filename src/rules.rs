// rules.rs - Owner-defined auto-moderation rules
//
// Rules are parsed out of free text with a fixed keyword table and evaluated
// in insertion order against every guild message. Only the first matching
// rule fires. Execution against Discord lives in enforcement.rs; everything
// in this file is pure.

use std::fmt;

const CONTAINS_CONDITION: &str = "message contains";
const MENTIONS_OWNER_CONDITION: &str = "message mentions owner";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleAction {
    Mute,
    Unmute,
    Kick,
    Ban,
    Unban,
}

impl RuleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::Mute => "MUTE",
            RuleAction::Unmute => "UNMUTE",
            RuleAction::Kick => "KICK",
            RuleAction::Ban => "BAN",
            RuleAction::Unban => "UNBAN",
        }
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub condition: String,
    pub action: RuleAction,
}

impl Rule {
    pub fn new(condition: impl Into<String>, action: RuleAction) -> Self {
        Self {
            condition: condition.into(),
            action,
        }
    }

    /// Whether this rule's condition holds for a message.
    /// Unknown condition shapes never trigger; an empty contains-word
    /// matches everything.
    pub fn matches(&self, content: &str, author_is_owner: bool) -> bool {
        let condition = self.condition.to_lowercase();

        if condition.contains("contains") {
            let word = condition.replace(CONTAINS_CONDITION, "");
            let word = word.trim();
            content.to_lowercase().contains(word)
        } else if condition.contains("mentions owner") {
            author_is_owner
        } else {
            false
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "If {} then {}", self.condition, self.action)
    }
}

// ============================================================================
// PARSING
// ============================================================================

type RuleBuilder = fn(&str) -> Option<Rule>;

/// Keyword table, checked top to bottom against the lower-cased text.
/// Builders receive the text as typed.
/// "ban" sits above "unban", so the UNBAN row is shadowed for any text
/// that reaches it.
const RULE_TABLE: &[(&str, RuleBuilder)] = &[
    ("mute", mute_rule),
    ("kick", kick_rule),
    ("ban", ban_rule),
    ("unban", unban_rule),
];

fn mute_rule(text: &str) -> Option<Rule> {
    // Last "mute" in any case; the word after it keeps the owner's casing
    let start = text
        .char_indices()
        .rev()
        .map(|(i, _)| i)
        .find(|&i| text[i..].get(..4).map_or(false, |head| head.eq_ignore_ascii_case("mute")))?
        + "mute".len();
    let word = text[start..].trim();
    Some(Rule::new(format!("{} {}", CONTAINS_CONDITION, word), RuleAction::Mute))
}

fn kick_rule(_: &str) -> Option<Rule> {
    Some(Rule::new(MENTIONS_OWNER_CONDITION, RuleAction::Kick))
}

// Fixed placeholder condition, not derived from the text
fn ban_rule(_: &str) -> Option<Rule> {
    Some(Rule::new("message contains abuse words", RuleAction::Ban))
}

fn unban_rule(_: &str) -> Option<Rule> {
    Some(Rule::new("message contains sorry", RuleAction::Unban))
}

/// Turn an owner's rule description into a rule, or None if no keyword hits.
pub fn parse_rule(text: &str) -> Option<Rule> {
    let lowered = text.to_lowercase();
    RULE_TABLE
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .and_then(|(_, build)| build(text))
}

// ============================================================================
// STORE
// ============================================================================

/// Ordered rule list. Shared by every guild the bot is in.
#[derive(Debug, Default, Clone)]
pub struct RuleStore {
    rules: Vec<Rule>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn first_match(&self, content: &str, author_is_owner: bool) -> Option<&Rule> {
        evaluate(&self.rules, content, author_is_owner)
    }
}

/// First rule (in storage order) whose condition holds.
pub fn evaluate<'r>(rules: &'r [Rule], content: &str, author_is_owner: bool) -> Option<&'r Rule> {
    rules.iter().find(|rule| rule.matches(content, author_is_owner))
}
