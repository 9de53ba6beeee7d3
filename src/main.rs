// main.rs - Warden moderation bot entry point
//
// Loads configuration, builds the shared state and HTTP collaborators,
// starts the keep-alive endpoint and runs the Discord client until Ctrl+C
// or an owner's shutdown command.

mod address;
mod audit;
mod chat;
mod commands;
mod config;
mod dispatch;
mod enforcement;
mod error;
mod gateway;
mod handler;
mod history;
mod intent;
mod keep_alive;
mod rules;
mod search;
mod state;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use serenity::{client::Client, framework::standard::StandardFramework, prelude::GatewayIntents};
use tokio::signal;

use crate::chat::OpenRouterChat;
use crate::commands::GENERAL_GROUP;
use crate::config::BotConfig;
use crate::handler::Handler;
use crate::search::DuckDuckGoSearch;
use crate::state::{bot_state, BotState, BotStateKey, Services, ServicesKey, ShardManagerContainer};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let config = match BotConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ {}", e);
            eprintln!("❌ {}", e);
            eprintln!("Set DISCORD_TOKEN in the environment or in a botconfig.txt / .env file.");
            return;
        }
    };

    if config.owner_ids.is_empty() {
        log::warn!("[MAIN] OWNER_IDS is empty, every owner-only action will be refused");
    }
    if config.api_key.is_none() {
        log::warn!("[MAIN] API_KEY is not set, chat replies will fail");
    }

    let services = match (OpenRouterChat::new(&config), DuckDuckGoSearch::new()) {
        (Ok(chat), Ok(search)) => Services {
            chat: Arc::new(chat),
            search: Arc::new(search),
        },
        (Err(e), _) | (_, Err(e)) => {
            log::error!("❌ Failed to build HTTP clients: {}", e);
            return;
        }
    };
    let state = Arc::new(BotState::from_config(&config));

    println!("🤖 Starting bot with prefix: '{}'", config.prefix);
    let keep_alive = keep_alive::spawn(config.keep_alive_port);

    let framework = StandardFramework::new()
        .configure(|c| {
            c.prefixes(Vec::<String>::new())
                .dynamic_prefix(|ctx, _msg| {
                    Box::pin(async move { Some(bot_state(ctx).await?.prefix().await) })
                })
                .case_insensitivity(true)
                .with_whitespace(true)
        })
        .after(|_ctx, msg, command_name, result| {
            Box::pin(async move {
                if let Err(e) = result {
                    log::error!(
                        "❌ Command '{}' failed for user {} ({}): {:?}",
                        command_name,
                        msg.author.name,
                        msg.author.id,
                        e
                    );
                }
            })
        })
        .group(&GENERAL_GROUP);

    let intents = GatewayIntents::non_privileged()
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MEMBERS;

    let mut client = match Client::builder(&config.token, intents)
        .event_handler(Handler {
            status: config.status.clone(),
        })
        .framework(framework)
        .await
    {
        Ok(client) => client,
        Err(e) => {
            log::error!("❌ Error creating Discord client: {:?}", e);
            eprintln!("❌ Error creating Discord client: {:?}", e);
            return;
        }
    };

    {
        let mut data = client.data.write().await;
        data.insert::<BotStateKey>(state);
        data.insert::<ServicesKey>(Arc::new(services));
        data.insert::<ShardManagerContainer>(client.shard_manager.clone());
    }
    let shard_manager = client.shard_manager.clone();

    println!("🚀 Bot is running... press Ctrl+C to stop");
    tokio::select! {
        _ = signal::ctrl_c() => {
            println!("\n⏹️ Stopping bot gracefully...");
            shard_manager.lock().await.shutdown_all().await;
        }
        result = client.start() => {
            if let Err(why) = result {
                log::error!("❌ Client error: {:?}", why);
                eprintln!("❌ Client error: {:?}", why);
            }
        }
    }

    keep_alive.abort();
    println!("👋 Bot shutdown complete");
}
