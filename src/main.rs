mod argument;
mod commands;
mod config;
mod error;
mod generation;
mod messages;
mod pipeline;
mod prompts;
mod related;
mod services;
mod shutdown;
mod title;
mod wordpress;
mod youtube;

use serenity::{
    async_trait,
    client::{Client, Context, EventHandler},
    framework::standard::StandardFramework,
    model::{channel::Message, gateway::Ready},
    prelude::GatewayIntents,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use crate::commands::{
    draft::{run_draft, DRAFTING_GROUP},
    help::HELP_GROUP,
    settings::SETTINGS_GROUP,
    suffix_invocation,
    topic::{run_topic, TOPICS_GROUP},
    SuffixCommand,
};
use crate::config::{load_bot_config, ConfigStore};
use crate::messages::Messages;
use crate::prompts::PromptStore;
use crate::services::{Services, ServicesKey};

const CONFIG_PATH: &str = "config/config.json";
const MESSAGES_PATH: &str = "config/messages.json";
const PROMPTS_PATH: &str = "config/prompts.json";

struct Handler {
    prefix: String,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _: Context, ready: Ready) {
        log::info!("[MAIN] Connected as {}", ready.user.name);
        println!("✅ Bot connected as {}!", ready.user.name);
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let attachments: Vec<&str> = msg.attachments.iter().map(|a| a.filename.as_str()).collect();
        log::info!(
            target: "user_activity",
            "{} ({}) in {}{}: {:?} attachments={:?}",
            msg.author.name,
            msg.author.id,
            msg.guild_id
                .map(|g| format!("guild {} channel ", g))
                .unwrap_or_else(|| "DM ".to_string()),
            msg.channel_id,
            msg.content,
            attachments
        );
        if let Some(reference) = msg.message_reference.as_ref().and_then(|r| r.message_id) {
            log::info!(target: "user_activity", "  in reply to message {}", reference);
        }

        if let Some((command, text)) = suffix_invocation(&msg.content, &self.prefix) {
            log::info!("[MAIN] Suffix invocation of {:?} by {}", command, msg.author.name);
            let result = match command {
                SuffixCommand::Draft => run_draft(&ctx, &msg, &text).await,
                SuffixCommand::Topic => run_topic(&ctx, &msg, &text).await,
            };
            if let Err(e) = result {
                log::error!("[MAIN] Suffix command {:?} failed: {:?}", command, e);
            }
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let credentials = match load_bot_config() {
        Ok(credentials) => credentials,
        Err(error) => {
            log::error!("❌ Failed to load botconfig.txt: {}", error);
            eprintln!("❌ Failed to load botconfig.txt: {}", error);
            eprintln!("Create a botconfig.txt file in the project root with DISCORD_TOKEN=... and AI_API_KEY=...");
            return;
        }
    };

    let config = match ConfigStore::open(CONFIG_PATH) {
        Ok(store) => Arc::new(store),
        Err(error) => {
            log::error!("❌ {}", error);
            eprintln!("❌ {}", error);
            return;
        }
    };
    let messages = Messages::load(Path::new(MESSAGES_PATH));
    let prompts = Arc::new(PromptStore::open(PROMPTS_PATH).await);

    let services = match Services::build(&credentials, config, prompts, messages).await {
        Ok(services) => Arc::new(services),
        Err(error) => {
            log::error!("❌ Failed to create HTTP client: {}", error);
            return;
        }
    };
    let shutdown_timeout = services.config.read().await.bot.shutdown_timeout;

    let prefix = credentials.prefix.clone();
    println!("🤖 Starting bot with prefix: '{}'", prefix);

    let framework = StandardFramework::new()
        .configure(|c| {
            c.prefix(&prefix)
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
        .group(&DRAFTING_GROUP)
        .group(&TOPICS_GROUP)
        .group(&SETTINGS_GROUP)
        .group(&HELP_GROUP);

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = match Client::builder(&credentials.discord_token, intents)
        .event_handler(Handler {
            prefix: prefix.clone(),
        })
        .framework(framework)
        .await
    {
        Ok(client) => client,
        Err(e) => {
            log::error!("❌ Error creating Discord client: {:?}", e);
            eprintln!("❌ Error creating Discord client: {:?}", e);
            eprintln!("Check your token in botconfig.txt file");
            return;
        }
    };

    {
        let mut data = client.data.write().await;
        data.insert::<ServicesKey>(services.clone());
    }

    println!("🚀 Bot is running... press Ctrl+C to stop");
    tokio::select! {
        _ = signal::ctrl_c() => {
            println!("\n⏹️ Stopping bot gracefully...");
        }
        result = client.start() => {
            if let Err(why) = result {
                log::error!("❌ Client error: {:?}", why);
                eprintln!("❌ Client error: {:?}", why);
            }
        }
    }

    let running = services.in_flight.active();
    if running > 0 {
        log::info!("[MAIN] Waiting for {} running commands (up to {}s)", running, shutdown_timeout);
    }
    if !services
        .in_flight
        .drain(Duration::from_secs(shutdown_timeout))
        .await
    {
        log::warn!(
            "[MAIN] {} commands still running after {}s, not waiting any longer",
            services.in_flight.active(),
            shutdown_timeout
        );
    }

    client.shard_manager.lock().await.shutdown_all().await;
    println!("✅ Bot stopped");
}
