//! Gateway wiring: client construction, event forwarding, shutdown.

use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use serenity::Client;
use serenity::all::{Context, EventHandler, GatewayIntents, Interaction, Ready};

use crate::config::Config;
use crate::dispatcher::{BotState, Dispatcher};
use crate::error::Result;
use crate::registry::Registry;

struct Handler {
    dispatcher: Arc<Dispatcher>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Ready! Logged in as {}", ready.user.name);
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        self.dispatcher.handle(&ctx, &interaction).await;
    }
}

/// Run the bot until the gateway stops or a shutdown signal arrives.
pub async fn run() -> Result<()> {
    let config = Config::load()?;

    let registry = Registry::load();
    info!("Loaded {} interaction names", registry.len());

    let state = Arc::new(BotState::new(config.clone()));
    let dispatcher = Arc::new(Dispatcher::new(registry, Arc::clone(&state)));

    // Slash-command interactions arrive without any gateway intents.
    let intents = GatewayIntents::empty();

    let mut client = Client::builder(&config.token, intents)
        .event_handler(Handler { dispatcher })
        .await?;

    state.set_shard_manager(Arc::clone(&client.shard_manager));

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::select! {
        result = client.start() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down...");
            shard_manager.shutdown_all().await;
        }
    }

    Ok(())
}
