use anyhow::Result;
use dotenvy::dotenv;
use log::{debug, error, info};
use serenity::async_trait;
use serenity::model::application::interaction::Interaction;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::*;
use std::path::Path;
use std::sync::Arc;

use elvia::commands::{
    builtin_registry, register_global_commands, register_guild_commands, CommandContext,
};
use elvia::core::Config;
use elvia::database::Database;
use elvia::dispatch::{CooldownTracker, DispatchPolicy, InteractionDispatcher, InteractionEvent};
use elvia::features::crash_report;
use elvia::i18n::I18n;

/// Display name used in embed footers
const BOT_NAME: &str = "Elvia";

struct Handler {
    dispatcher: Arc<InteractionDispatcher>,
    guild_id: Option<GuildId>,
    prefix: String,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("📡 Connected to {} guilds", ready.guilds.len());
        info!("🤖 Bot ID: {}", ready.user.id);

        if let Some(shard) = ready.shard {
            info!("⚡ Shard: {}/{}", shard[0] + 1, shard[1]);
        }

        let registry = self.dispatcher.registry();
        let registered = match self.guild_id {
            Some(guild_id) => register_guild_commands(&ctx, guild_id, registry).await,
            None => register_global_commands(&ctx, registry).await,
        };
        if let Err(e) = registered {
            error!("Failed to register application commands: {e:#}");
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let event = InteractionEvent::from_message(&ctx, &msg, &self.prefix).await;
        let Some(request_id) = event.invocation().map(|invocation| invocation.request_id) else {
            return;
        };
        let outcome = self.dispatcher.dispatch(event).await;
        debug!("[{request_id}] Dispatch outcome: {outcome:?}");
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let event = InteractionEvent::from_serenity(&ctx, interaction);
        let request_id = event.invocation().map(|invocation| invocation.request_id);
        let outcome = self.dispatcher.dispatch(event).await;
        match request_id {
            Some(request_id) => debug!("[{request_id}] Dispatch outcome: {outcome:?}"),
            None => debug!("Ignored unsupported interaction"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    crash_report::install(config.logger_webhook_url.clone(), BOT_NAME.to_string());

    info!("Starting {BOT_NAME}...");

    let database = Database::new(&config.database_path).await?;

    let mut i18n = I18n::builtin(&config.default_locale)?;
    if let Some(dir) = &config.locales_dir {
        i18n.load_dir(Path::new(dir))?;
    }
    info!("🌐 Available locales: {}", i18n.locales().join(", "));

    let context = CommandContext::new(Arc::new(database), Arc::new(i18n), BOT_NAME)?;
    let registry = builtin_registry();
    info!("📋 {} commands registered", registry.len());

    let cooldowns = Arc::new(CooldownTracker::new());
    let dispatcher = InteractionDispatcher::new(
        Arc::new(registry),
        Arc::new(context),
        cooldowns.clone(),
        DispatchPolicy::from_config(&config),
    );

    if config.unsafe_mode {
        info!("🧪 Unsafe mode enabled, commands under development are available");
    }

    // Parse guild ID if provided for development mode
    let guild_id = config
        .discord_guild_id
        .as_ref()
        .and_then(|id| id.parse::<u64>().ok())
        .map(GuildId);

    let handler = Handler {
        dispatcher: Arc::new(dispatcher),
        guild_id,
        prefix: config.command_prefix.clone(),
    };

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {e}");
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    info!("Bot configured successfully. Connecting to Discord gateway...");
    info!("Gateway intents: {intents:?}");

    let started = client.start().await;
    cooldowns.shutdown();

    if let Err(why) = started {
        error!("Gateway connection failed: {why:?}");
        return Err(anyhow::anyhow!(
            "Failed to establish gateway connection: {}",
            why
        ));
    }

    Ok(())
}
