// state.rs - Process-wide bot state and TypeMap keys
//
// BotState owns everything that used to be a global: the owner set (fixed at
// startup), the runtime settings (prefix, log channel), the rule store and
// the per-user chat histories. serenity dispatches events concurrently, so
// the mutable parts sit behind tokio locks. Locks are never held across a
// call to Discord or to an external service.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serenity::client::bridge::gateway::ShardManager;
use serenity::client::Context;
use serenity::model::id::{ChannelId, UserId};
use serenity::prelude::TypeMapKey;
use tokio::sync::{Mutex, RwLock};

use crate::chat::ChatBackend;
use crate::config::BotConfig;
use crate::history::ConversationHistory;
use crate::rules::{Rule, RuleStore};
use crate::search::SearchBackend;

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub prefix: String,
    pub log_channel: Option<ChannelId>,
}

pub struct BotState {
    owners: HashSet<UserId>,
    settings: RwLock<RuntimeSettings>,
    rules: RwLock<RuleStore>,
    histories: Mutex<HashMap<UserId, ConversationHistory>>,
}

impl BotState {
    pub fn new(owners: HashSet<UserId>, prefix: &str, log_channel: Option<ChannelId>) -> Self {
        Self {
            owners,
            settings: RwLock::new(RuntimeSettings {
                prefix: prefix.to_string(),
                log_channel,
            }),
            rules: RwLock::new(RuleStore::new()),
            histories: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(config.owner_ids.clone(), &config.prefix, config.log_channel)
    }

    pub fn is_owner(&self, user_id: UserId) -> bool {
        self.owners.contains(&user_id)
    }

    pub async fn prefix(&self) -> String {
        self.settings.read().await.prefix.clone()
    }

    pub async fn set_prefix(&self, prefix: &str) {
        self.settings.write().await.prefix = prefix.to_string();
    }

    pub async fn log_channel(&self) -> Option<ChannelId> {
        self.settings.read().await.log_channel
    }

    pub async fn set_log_channel(&self, channel_id: ChannelId) {
        self.settings.write().await.log_channel = Some(channel_id);
    }

    pub async fn add_rule(&self, rule: Rule) {
        self.rules.write().await.add(rule);
    }

    pub async fn rules(&self) -> Vec<Rule> {
        self.rules.read().await.rules().to_vec()
    }

    /// Clone of the first rule matching the message, so the caller can act
    /// on it without holding the store lock.
    pub async fn first_matching_rule(&self, content: &str, author_is_owner: bool) -> Option<Rule> {
        self.rules.read().await.first_match(content, author_is_owner).cloned()
    }

    /// Append a user turn and return the window to send to the chat backend.
    pub async fn record_user_turn(&self, user_id: UserId, text: &str) -> Vec<String> {
        let mut histories = self.histories.lock().await;
        let history = histories.entry(user_id).or_insert_with(ConversationHistory::new);
        history.push_user(text);
        history.turns().to_vec()
    }

    pub async fn record_ai_turn(&self, user_id: UserId, text: &str) {
        let mut histories = self.histories.lock().await;
        histories
            .entry(user_id)
            .or_insert_with(ConversationHistory::new)
            .push_ai(text);
    }

    pub async fn history_len(&self, user_id: UserId) -> usize {
        self.histories
            .lock()
            .await
            .get(&user_id)
            .map_or(0, |history| history.turns().len())
    }
}

/// External collaborators shared by all handlers
pub struct Services {
    pub chat: Arc<dyn ChatBackend>,
    pub search: Arc<dyn SearchBackend>,
}

// TypeMap key for the shared bot state
pub struct BotStateKey;
impl TypeMapKey for BotStateKey {
    type Value = Arc<BotState>;
}

// TypeMap key for chat / search collaborators
pub struct ServicesKey;
impl TypeMapKey for ServicesKey {
    type Value = Arc<Services>;
}

// TypeMap key for the shard manager (latency, clean shutdown)
pub struct ShardManagerContainer;
impl TypeMapKey for ShardManagerContainer {
    type Value = Arc<Mutex<ShardManager>>;
}

pub async fn bot_state(ctx: &Context) -> Option<Arc<BotState>> {
    ctx.data.read().await.get::<BotStateKey>().cloned()
}

pub async fn services(ctx: &Context) -> Option<Arc<Services>> {
    ctx.data.read().await.get::<ServicesKey>().cloned()
}
