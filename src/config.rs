// config.rs - Startup configuration
//
// Values come from the process environment. A KEY=VALUE file (botconfig.txt
// or .env, searched in a few locations) may seed the environment first;
// variables that are already set always win over the file.

use std::collections::HashSet;
use std::env;
use std::fs;

use serenity::model::id::{ChannelId, UserId};

use crate::error::{BotError, BotResult};

pub const DEFAULT_PREFIX: &str = "!";
pub const DEFAULT_AI_MODEL: &str = "openrouter-gpt-3.5-mini";
pub const DEFAULT_AI_BASE_URL: &str = "https://api.openrouter.ai/v1";
pub const DEFAULT_KEEP_ALIVE_PORT: u16 = 8000;
pub const DEFAULT_STATUS: &str = "Serving the Jaat Clan";

const CONFIG_PATHS: [&str; 6] = [
    "botconfig.txt",
    ".env",
    "../botconfig.txt",
    "../.env",
    "../../botconfig.txt",
    "src/botconfig.txt",
];

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub prefix: String,
    pub owner_ids: HashSet<UserId>,
    pub log_channel: Option<ChannelId>,
    pub api_key: Option<String>,
    pub ai_model: String,
    pub ai_base_url: String,
    pub keep_alive_port: u16,
    pub status: String,
}

impl BotConfig {
    /// Seed the environment from the first config file found, then read it.
    pub fn load() -> BotResult<Self> {
        match load_config_file() {
            Some(path) => println!("✅ Configuration file loaded from {}", path),
            None => log::info!("[CONFIG] No config file found, using environment only"),
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> BotResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("DISCORD_TOKEN")
            .map(|t| t.trim().to_string())
            .ok_or_else(|| BotError::Config("DISCORD_TOKEN is not set".to_string()))?;
        if token.is_empty() || token == "YOUR_BOT_TOKEN_HERE" {
            return Err(BotError::Config(
                "DISCORD_TOKEN is empty or still set to the placeholder".to_string(),
            ));
        }

        let prefix = lookup("PREFIX")
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());

        let owner_ids = parse_owner_ids(&lookup("OWNER_IDS").unwrap_or_default());
        if owner_ids.is_empty() {
            log::warn!("[CONFIG] OWNER_IDS is empty, every owner-only action will be denied");
        }

        let log_channel = lookup("LOG_CHANNEL_ID")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|id| *id != 0)
            .map(ChannelId);

        let keep_alive_port = match lookup("KEEP_ALIVE_PORT") {
            Some(port) => port
                .trim()
                .parse::<u16>()
                .map_err(|_| BotError::Config(format!("Invalid KEEP_ALIVE_PORT value: {}", port)))?,
            None => DEFAULT_KEEP_ALIVE_PORT,
        };

        Ok(Self {
            token,
            prefix,
            owner_ids,
            log_channel,
            api_key: lookup("API_KEY").filter(|k| !k.trim().is_empty()),
            ai_model: lookup("AI_MODEL").unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
            ai_base_url: lookup("AI_BASE_URL").unwrap_or_else(|| DEFAULT_AI_BASE_URL.to_string()),
            keep_alive_port,
            status: lookup("BOT_STATUS").unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        })
    }
}

/// Comma separated ids; anything that is not all digits is skipped.
pub fn parse_owner_ids(raw: &str) -> HashSet<UserId> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|part| part.parse::<u64>().ok())
        .map(UserId)
        .collect()
}

/// Parse KEY=VALUE lines, skipping blanks and `#` comments.
pub fn parse_config_lines(content: &str) -> Vec<(String, String)> {
    // Remove BOM if present
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let equals_pos = line.find('=')?;
            let key = line[..equals_pos].trim().to_string();
            let value = line[equals_pos + 1..].trim().trim_matches('"').to_string();
            Some((key, value))
        })
        .collect()
}

fn load_config_file() -> Option<&'static str> {
    for config_path in CONFIG_PATHS {
        let Ok(content) = fs::read_to_string(config_path) else {
            // Try next path
            continue;
        };

        for (key, value) in parse_config_lines(&content) {
            if env::var_os(&key).is_none() {
                env::set_var(&key, &value);
            }
        }
        return Some(config_path);
    }
    None
}
