// testing.rs - Recording fakes for the Discord and HTTP collaborators

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serenity::model::id::{GuildId, UserId};

use crate::audit::AuditSink;
use crate::chat::ChatBackend;
use crate::error::{BotError, BotResult};
use crate::gateway::{BannedUser, ModerationGateway};
use crate::search::{SearchBackend, SearchResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Timeout(UserId, Option<Duration>),
    Kick(UserId, String),
    Ban(UserId, String),
    Unban(UserId, String),
    FetchBans,
}

#[derive(Default)]
pub struct FakeGateway {
    pub calls: Mutex<Vec<GatewayCall>>,
    pub bans: Vec<BannedUser>,
    pub forbid: bool,
    /// Fail every action with a non-permission error
    pub unavailable: bool,
    pub latency: Option<Duration>,
}

impl FakeGateway {
    pub fn forbidden() -> Self {
        Self { forbid: true, ..Self::default() }
    }

    pub fn unavailable() -> Self {
        Self { unavailable: true, ..Self::default() }
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: GatewayCall) -> BotResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.forbid {
            Err(BotError::PermissionDenied("Missing Permissions".to_string()))
        } else if self.unavailable {
            Err(BotError::ExternalService("Discord is unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ModerationGateway for FakeGateway {
    async fn timeout_member(&self, _: GuildId, user_id: UserId, duration: Option<Duration>, _: &str) -> BotResult<()> {
        self.record(GatewayCall::Timeout(user_id, duration))
    }

    async fn kick_member(&self, _: GuildId, user_id: UserId, reason: &str) -> BotResult<()> {
        self.record(GatewayCall::Kick(user_id, reason.to_string()))
    }

    async fn ban_member(&self, _: GuildId, user_id: UserId, reason: &str) -> BotResult<()> {
        self.record(GatewayCall::Ban(user_id, reason.to_string()))
    }

    async fn unban_user(&self, _: GuildId, user_id: UserId, reason: &str) -> BotResult<()> {
        self.record(GatewayCall::Unban(user_id, reason.to_string()))
    }

    async fn fetch_bans(&self, _: GuildId) -> BotResult<Vec<BannedUser>> {
        self.calls.lock().unwrap().push(GatewayCall::FetchBans);
        Ok(self.bans.clone())
    }

    async fn latency(&self) -> Option<Duration> {
        self.latency
    }
}

#[derive(Default)]
pub struct FakeAudit {
    pub entries: Mutex<Vec<String>>,
}

impl FakeAudit {
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for FakeAudit {
    async fn record(&self, _: GuildId, text: &str) {
        self.entries.lock().unwrap().push(text.to_string());
    }
}

/// Replies with a canned answer, or fails when `reply` is None
#[derive(Default)]
pub struct FakeChat {
    pub reply: Option<String>,
    pub seen: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl ChatBackend for FakeChat {
    async fn complete(&self, history: &[String]) -> BotResult<String> {
        self.seen.lock().unwrap().push(history.to_vec());
        self.reply
            .clone()
            .ok_or_else(|| BotError::ExternalService("timed out".to_string()))
    }
}

#[derive(Default)]
pub struct FakeSearch {
    pub results: Vec<SearchResult>,
    pub queries: Mutex<Vec<String>>,
    pub fail: bool,
}

#[async_trait]
impl SearchBackend for FakeSearch {
    async fn search(&self, query: &str, max_results: usize) -> BotResult<Vec<SearchResult>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(BotError::ExternalService("search timed out".to_string()));
        }
        Ok(self.results.iter().take(max_results).cloned().collect())
    }
}
