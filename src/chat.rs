// chat.rs - Conversational fallback backed by an OpenRouter-style API
//
// The backend is stateless: callers pass the user's trailing history window
// and get one completion back. Every turn is sent with the "user" role, the
// same way the history is recorded.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::BotConfig;
use crate::error::{BotError, BotResult};

pub const CHAT_FAILURE_REPLY: &str = "❌ Sorry, I cannot respond right now.";
pub const CHAT_TIMEOUT: Duration = Duration::from_secs(15);
const CHAT_MAX_TOKENS: i32 = 150;

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, history: &[String]) -> BotResult<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: i32,
}

pub struct OpenRouterChat {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenRouterChat {
    pub fn new(config: &BotConfig) -> BotResult<Self> {
        let client = reqwest::Client::builder().timeout(CHAT_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: config.ai_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.ai_model.clone(),
        })
    }
}

pub fn build_messages(history: &[String]) -> Vec<ChatMessage> {
    history
        .iter()
        .map(|turn| ChatMessage {
            role: "user".to_string(),
            content: turn.clone(),
        })
        .collect()
}

/// Pull `choices[0].message.content` out of a completion response.
pub fn extract_reply(response_json: &serde_json::Value) -> Option<String> {
    response_json["choices"]
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(|content| content.trim().to_string())
}

#[async_trait]
impl ChatBackend for OpenRouterChat {
    async fn complete(&self, history: &[String]) -> BotResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| BotError::ExternalService("API_KEY is not configured".to_string()))?;

        let request = ChatRequest {
            model: &self.model,
            messages: build_messages(history),
            max_tokens: CHAT_MAX_TOKENS,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BotError::ExternalService(format!(
                "chat request failed: HTTP {}",
                response.status()
            )));
        }

        let response_json: serde_json::Value = response.json().await?;
        extract_reply(&response_json)
            .ok_or_else(|| BotError::ExternalService("Failed to extract content from API response".to_string()))
    }
}
